//! Integration tests for scorepage
//!
//! Tests reading, analyzing and writing whole pages through the public API.

use proptest::prelude::*;
use scorepage::grouping::ChordDatabase;
use scorepage::page::ItemArena;
use scorepage::{Item, ItemType, Page, PageFormat, Pass, PmxOptions, ScoreError, SlurKind};
use std::collections::HashSet;

const HYMN: &str = "8 1 0 0 0 200
3 1 2
17 1 5 0 1
1 1 10 5 10 0 1
1 1 20 4 10 0 1
1 1 30 7 10 0 2
5 1 31 10 10 39
14 1 50
1 1 60 7 10 0 1
1 1 70 4 10 0 1
1 1 80 5 10 0 2
14 1 100
t 1 10 -5 0 0 0 0 0 0 0 4
Glo-
";

#[test]
fn test_binary_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hymn.mus");
    let page = Page::from_pmx(HYMN).unwrap();
    page.write_file(&path, PageFormat::Binary).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(scorepage::codec::detect_format(&bytes), PageFormat::Binary);
    let reread = Page::read_file(&path).unwrap();
    assert_eq!(reread.len(), page.len());
    assert_eq!(reread.to_pmx(PmxOptions::default()), page.to_pmx(PmxOptions::default()));
    assert_eq!(reread.to_binary(), bytes);
}

#[test]
fn test_pmx_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hymn.pmx");
    let page = Page::from_pmx(HYMN).unwrap();
    page.write_file(&path, PageFormat::Pmx).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, HYMN);
    let reread = Page::read_file(&path).unwrap();
    let text_items: Vec<&str> = reread.items().filter_map(|(_, item)| item.text()).collect();
    assert_eq!(text_items, vec!["Glo-"]);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Page::read_file(dir.path().join("absent.mus"));
    assert!(matches!(result, Err(ScoreError::Io(_))));
}

#[test]
fn test_truncated_binary_is_format_error() {
    let page = Page::from_pmx(HYMN).unwrap();
    let bytes = page.to_binary();
    let mut broken = bytes[..bytes.len() - 6].to_vec();
    broken.extend_from_slice(&(-9999.0f32).to_le_bytes());
    assert!(matches!(Page::from_bytes(&broken), Err(ScoreError::Format { .. })));
}

#[test]
fn test_hymn_analysis() {
    let mut page = Page::from_pmx(HYMN).unwrap();
    page.analyze().unwrap();

    assert_eq!(page.staff_duration(1).unwrap(), 8.0);
    assert_eq!(page.system_count().unwrap(), 1);
    let measures = page.measures(0).unwrap().to_vec();
    assert_eq!(measures.len(), 2);
    assert_eq!(measures[0].duration, 4.0);
    assert_eq!(measures[1].offset, 4.0);

    // One sharp in the key: every F is F#, barlines included.
    let names: Vec<String> = [3, 4, 5, 8, 9, 10]
        .iter()
        .map(|&index| {
            let id = page.id_at(index).unwrap();
            page.pitch(id).unwrap().map(|p| p.name()).unwrap_or_default()
        })
        .collect();
    assert_eq!(names, vec!["G4", "F#4", "B4", "B4", "F#4", "G4"]);

    let slur = page.id_at(6).unwrap();
    assert_eq!(page.slur_kind(slur).unwrap(), Some(SlurKind::HangRight));
    let lyric = page.id_at(12).unwrap();
    let note = page.id_at(3).unwrap();
    assert_eq!(page.lyrics_of(lyric).unwrap().and_then(|g| g.head()), Some(note));
}

#[test]
fn test_analysis_leaves_binary_output_alone() {
    let mut page = Page::from_pmx(HYMN).unwrap();
    let before = page.to_binary();
    page.analyze().unwrap();
    assert_eq!(page.to_binary(), before);
    assert_eq!(page.to_pmx(PmxOptions::default()), HYMN);
    assert!(page.to_pmx(PmxOptions { include_auto: true }).contains("@auto::staffOffset:"));
}

fn ordinary_item() -> impl Strategy<Value = Item> {
    (1i32..=14, 1u8..=4, prop::collection::vec(-400i32..400, 1..10)).prop_map(|(code, staff, rest)| {
        let mut params = vec![f64::from(staff)];
        params.extend(rest.into_iter().map(|v| f64::from(v) / 4.0));
        Item::with_params(ItemType::from_code(f64::from(code)), &params)
    })
}

fn payload_item(item_type: ItemType) -> impl Strategy<Value = Item> {
    (1u8..=4, prop::collection::vec(-400i32..400, 1..8), "[A-Za-z][A-Za-z0-9 .,-]{0,11}").prop_map(
        move |(staff, rest, text)| {
            let mut params = vec![f64::from(staff)];
            params.extend(rest.into_iter().map(|v| f64::from(v) / 4.0));
            let mut item = Item::with_params(item_type, &params);
            item.set_text(&text);
            item
        },
    )
}

fn binary_item() -> impl Strategy<Value = Item> {
    prop_oneof![
        4 => ordinary_item(),
        1 => payload_item(ItemType::Text),
        1 => payload_item(ItemType::ImportedGraphic),
    ]
}

fn text_item() -> impl Strategy<Value = Item> {
    prop_oneof![4 => ordinary_item(), 1 => payload_item(ItemType::Text)]
}

fn analysis_item() -> impl Strategy<Value = Item> {
    let note = (1u8..=3, 0u8..40, 0u8..12, prop::sample::select(vec![0.0, 10.0, 12.0, 21.0]), 1u8..=4)
        .prop_map(|(staff, hpos, vpos, p5, eighths)| {
            let params = [f64::from(staff), f64::from(hpos) * 5.0, f64::from(vpos), p5, 0.0, f64::from(eighths) / 2.0];
            Item::with_params(ItemType::Note, &params)
        });
    let slur = (1u8..=3, 0u8..40, 1u8..10, 6u8..10).prop_map(|(staff, start, span, height)| {
        let left = f64::from(start) * 5.0 + 1.0;
        let params = [f64::from(staff), left, f64::from(height), f64::from(height), left + f64::from(span) * 5.0];
        Item::with_params(ItemType::Slur, &params)
    });
    let barline = (1u8..=3, 0u8..40, 0u8..3).prop_map(|(staff, hpos, height)| {
        Item::with_params(ItemType::Barline, &[f64::from(staff), f64::from(hpos) * 5.0 + 2.5, f64::from(height)])
    });
    prop_oneof![4 => note, 1 => slur, 1 => barline]
}

proptest! {
    #[test]
    fn prop_binary_round_trip(items in prop::collection::vec(binary_item(), 0..20)) {
        let mut page = Page::new();
        for item in items {
            page.add_item(item);
        }
        let bytes = page.to_binary();
        let reread = Page::from_bytes(&bytes).unwrap();
        prop_assert_eq!(reread.len(), page.len());
        prop_assert_eq!(reread.to_binary(), bytes);
        prop_assert_eq!(reread.to_pmx(PmxOptions::default()), page.to_pmx(PmxOptions::default()));
    }

    #[test]
    fn prop_pmx_round_trip(items in prop::collection::vec(text_item(), 0..20)) {
        let mut page = Page::new();
        for item in items {
            page.add_item(item);
        }
        let text = page.to_pmx(PmxOptions::default());
        let reread = Page::from_pmx(&text).unwrap();
        prop_assert_eq!(reread.to_pmx(PmxOptions::default()), text);
    }

    #[test]
    fn prop_items_belong_to_one_group(pairs in prop::collection::vec((0usize..12, 0usize..12), 0..30)) {
        let mut arena = ItemArena::new();
        let ids: Vec<_> = (0..12)
            .map(|i| arena.push(Item::with_params(ItemType::Note, &[1.0, 10.0, f64::from(i as u8), 0.0, 0.0, 1.0])))
            .collect();
        let mut chords = ChordDatabase::new();
        for &(a, b) in &pairs {
            chords.link_items(&arena, ids[a], ids[b]);
            prop_assert!(chords.lookup(ids[a]).is_some());
            prop_assert!(chords.lookup(ids[b]).is_some());
        }
        let mut seen = HashSet::new();
        for (gid, group) in chords.groups() {
            for &id in &group.items {
                prop_assert!(seen.insert(id), "item in two groups");
                prop_assert_eq!(chords.lookup(id), Some(gid));
            }
        }
        for &(a, b) in &pairs {
            prop_assert!(seen.contains(&ids[a]) && seen.contains(&ids[b]));
        }
    }

    #[test]
    fn prop_reanalysis_is_stable(items in prop::collection::vec(analysis_item(), 0..30)) {
        let mut page = Page::new();
        for item in items {
            page.add_item(item);
        }
        page.analyze().unwrap();
        let first = page.to_pmx(PmxOptions { include_auto: true });
        page.invalidate(Pass::Sorted).unwrap();
        page.analyze().unwrap();
        prop_assert_eq!(page.to_pmx(PmxOptions { include_auto: true }), first);
    }
}
