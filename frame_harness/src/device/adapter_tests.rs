/// Unit tests for adapter selection

use crate::device::adapter::*;
use crate::error::Error;

fn adapter(index: usize, kind: AdapterKind, level: FeatureLevel) -> AdapterInfo {
    AdapterInfo {
        index,
        name: format!("{:?} adapter {}", kind, index),
        kind,
        vendor_id: 0x10DE,
        device_id: index as u32,
        feature_level: level,
        dedicated_video_memory: 0,
    }
}

const MIN: FeatureLevel = FeatureLevel::new(11, 0);
const LOW: FeatureLevel = FeatureLevel::new(10, 1);
const HIGH: FeatureLevel = FeatureLevel::new(12, 1);

/// Select with a fixed list, ordered discrete-first for HighPerformance
fn select(adapters: &[AdapterInfo]) -> crate::error::Result<AdapterInfo> {
    select_adapter(
        &DEFAULT_SELECTION_PASSES,
        |preference| {
            let mut list = adapters.to_vec();
            if preference == GpuPreference::HighPerformance {
                list.sort_by_key(|a| match a.kind {
                    AdapterKind::Discrete => 0,
                    AdapterKind::Integrated => 1,
                    _ => 2,
                });
            }
            Ok(list)
        },
        |a| a.feature_level >= MIN,
    )
}

// ============================================================================
// FeatureLevel / AdapterKind
// ============================================================================

#[test]
fn test_feature_level_ordering() {
    assert!(FeatureLevel::new(11, 0) < FeatureLevel::new(11, 1));
    assert!(FeatureLevel::new(11, 1) < FeatureLevel::new(12, 0));
    assert_eq!(format!("{}", FeatureLevel::new(12, 1)), "12.1");
}

#[test]
fn test_predicates_reject_software() {
    let sw = adapter(0, AdapterKind::Software, HIGH);
    assert!(!prefer_discrete(&sw));
    assert!(!any_hardware(&sw));

    let integrated = adapter(1, AdapterKind::Integrated, HIGH);
    assert!(!prefer_discrete(&integrated));
    assert!(any_hardware(&integrated));
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_software_only_list_fails() {
    let adapters = vec![
        adapter(0, AdapterKind::Software, HIGH),
        adapter(1, AdapterKind::Software, HIGH),
    ];
    match select(&adapters) {
        Err(Error::AdapterSelectionFailed(_)) => {}
        other => panic!("expected AdapterSelectionFailed, got {:?}", other),
    }
}

#[test]
fn test_empty_list_fails() {
    assert!(matches!(select(&[]), Err(Error::AdapterSelectionFailed(_))));
}

#[test]
fn test_discrete_preferred_over_integrated() {
    let adapters = vec![
        adapter(0, AdapterKind::Integrated, HIGH),
        adapter(1, AdapterKind::Discrete, HIGH),
    ];
    assert_eq!(select(&adapters).unwrap().index, 1);
}

#[test]
fn test_falls_back_to_integrated_without_discrete() {
    let adapters = vec![
        adapter(0, AdapterKind::Software, HIGH),
        adapter(1, AdapterKind::Integrated, MIN),
    ];
    let selected = select(&adapters).unwrap();
    assert_eq!(selected.index, 1);
    assert_eq!(selected.kind, AdapterKind::Integrated);
}

#[test]
fn test_discrete_below_min_level_is_skipped() {
    let adapters = vec![
        adapter(0, AdapterKind::Discrete, LOW),
        adapter(1, AdapterKind::Integrated, MIN),
    ];
    assert_eq!(select(&adapters).unwrap().index, 1);
}

#[test]
fn test_all_below_min_level_fails() {
    let adapters = vec![
        adapter(0, AdapterKind::Discrete, LOW),
        adapter(1, AdapterKind::Integrated, LOW),
    ];
    assert!(matches!(select(&adapters), Err(Error::AdapterSelectionFailed(_))));
}

#[test]
fn test_strict_enumeration_failure_falls_back() {
    let adapters = vec![adapter(3, AdapterKind::Virtual, MIN)];
    let mut preferences = Vec::new();

    let selected = select_adapter(
        &DEFAULT_SELECTION_PASSES,
        |preference| {
            preferences.push(preference);
            match preference {
                GpuPreference::HighPerformance => {
                    Err(Error::BackendError("preference query unsupported".to_string()))
                }
                GpuPreference::Unspecified => Ok(adapters.clone()),
            }
        },
        |a| a.feature_level >= MIN,
    )
    .unwrap();

    assert_eq!(selected.index, 3);
    assert_eq!(
        preferences,
        vec![GpuPreference::HighPerformance, GpuPreference::Unspecified]
    );
}

#[test]
fn test_second_pass_not_run_when_first_succeeds() {
    let adapters = vec![adapter(0, AdapterKind::Discrete, HIGH)];
    let mut calls = 0;
    select_adapter(
        &DEFAULT_SELECTION_PASSES,
        |_| {
            calls += 1;
            Ok(adapters.clone())
        },
        |_| true,
    )
    .unwrap();
    assert_eq!(calls, 1);
}

#[test]
fn test_probe_overrides_reported_level() {
    // The probe decides, not the reported level (backends may test-create a device)
    let adapters = vec![
        adapter(0, AdapterKind::Discrete, HIGH),
        adapter(1, AdapterKind::Discrete, HIGH),
    ];
    let selected = select_adapter(
        &DEFAULT_SELECTION_PASSES,
        |_| Ok(adapters.clone()),
        |a| a.index == 1,
    )
    .unwrap();
    assert_eq!(selected.index, 1);
}

#[test]
fn test_every_list_with_capable_hardware_selects_hardware() {
    let kinds = [
        AdapterKind::Discrete,
        AdapterKind::Integrated,
        AdapterKind::Virtual,
        AdapterKind::Software,
        AdapterKind::Other,
    ];
    let levels = [LOW, MIN, HIGH];

    // Every list of three adapters drawn from kinds x levels
    let candidates: Vec<(AdapterKind, FeatureLevel)> = kinds
        .iter()
        .flat_map(|&k| levels.iter().map(move |&l| (k, l)))
        .collect();

    for a in &candidates {
        for b in &candidates {
            for c in &candidates {
                let list = vec![
                    adapter(0, a.0, a.1),
                    adapter(1, b.0, b.1),
                    adapter(2, c.0, c.1),
                ];
                let has_capable_hardware = list
                    .iter()
                    .any(|x| !x.kind.is_software() && x.feature_level >= MIN);

                match select(&list) {
                    Ok(selected) => {
                        assert!(has_capable_hardware);
                        assert!(!selected.kind.is_software());
                        assert!(selected.feature_level >= MIN);
                        // A capable discrete adapter always wins when present
                        if list.iter().any(|x| x.kind == AdapterKind::Discrete && x.feature_level >= MIN) {
                            assert_eq!(selected.kind, AdapterKind::Discrete);
                        }
                    }
                    Err(Error::AdapterSelectionFailed(_)) => assert!(!has_capable_hardware),
                    Err(other) => panic!("unexpected error {:?}", other),
                }
            }
        }
    }
}
