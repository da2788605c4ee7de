//! Pass scheduling for [`Page`].

use super::Page;
use crate::analysis::{beams, chords, duration, layers, lyrics, pitch, staves, systems, ties, tuplets};
use crate::error::ScoreError;
use crate::measure;
use crate::p3::P3Database;
use crate::validity::Pass;
use tracing::debug;

impl Page {
    /// Bring `pass` up to date, running stale prerequisites first.
    pub fn ensure(&mut self, pass: Pass) -> Result<(), ScoreError> {
        // Only edits and reloads move `unmodified`; there is nothing to run.
        if pass == Pass::Unmodified || self.validity.is_valid(pass.name()) {
            return Ok(());
        }
        for &parent in pass.parents() {
            self.ensure(parent)?;
        }
        self.run(pass)?;
        self.validity.validate(pass.name())
    }

    fn run(&mut self, pass: Pass) -> Result<(), ScoreError> {
        self.arena.clear_auto(pass.owned_annotations());
        match pass {
            Pass::Unmodified => {}
            Pass::Sorted => self.sorted = staves::sorted_ids(&self.arena),
            Pass::Staves => {
                self.staves = staves::partition(&self.arena, &self.sorted, &self.config)?;
            }
            Pass::Durations => {
                self.staff_durations.clear();
                for (&staff, items) in &self.staves {
                    let total = duration::analyze_staff(&mut self.arena, items, &self.config);
                    self.staff_durations.insert(staff, total);
                }
            }
            Pass::Systems => {
                self.systems = systems::group(&mut self.arena, &self.staves, self.config.max_staff);
                self.staff_to_system = self
                    .systems
                    .iter()
                    .enumerate()
                    .flat_map(|(index, system)| system.staves.iter().map(move |&staff| (staff, index)))
                    .collect();
            }
            Pass::Barlines => {
                self.measures = self.systems.iter().map(|system| measure::segment(&self.arena, &system.items)).collect();
            }
            Pass::Pitches => pitch::spell_systems(&mut self.arena, &self.systems),
            Pass::Chords => {
                self.chords.clear();
                chords::link_chords(&mut self.arena, &self.staves, &self.config, &mut self.chords);
            }
            Pass::Beams => {
                self.beams.clear();
                beams::link_beams(&self.arena, &self.staves, &self.chords, &self.config, &mut self.beams);
            }
            Pass::Tuplets => {
                self.tuplets.clear();
                tuplets::link_tuplets(&self.arena, &self.staves, &self.beams, &self.config, &mut self.tuplets);
            }
            Pass::Layers => layers::assign_layers(&mut self.arena, &self.staves),
            Pass::Ties => {
                self.ties = ties::find_ties(&mut self.arena, &self.staves, &self.config);
                self.tied_next = self.ties.links.iter().map(|link| (link.first, link.second)).collect();
                self.tied_last = self.ties.links.iter().map(|link| (link.second, link.first)).collect();
                self.slur_kinds = self.ties.kinds.iter().copied().collect();
            }
            Pass::P3 => {
                let (left, right) = (self.config.left_margin, self.config.right_margin);
                self.p3 = self
                    .systems
                    .iter()
                    .map(|system| {
                        let mut index = P3Database::with_margins(left, right);
                        for &id in &system.items {
                            if let Some(item) = self.arena.get(id) {
                                index.add_item(id, item, item.auto_f64("staffOffset"));
                            }
                        }
                        index.prepare();
                        index
                    })
                    .collect();
            }
            Pass::Lyrics => {
                self.lyrics.clear();
                lyrics::link_lyrics(&self.arena, &self.staves, &self.config, &mut self.lyrics);
            }
        }
        debug!(pass = pass.name(), "analysis pass complete");
        Ok(())
    }
}
