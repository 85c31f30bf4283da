//! End-to-end pipeline tests: holdings table -> features -> similarity +
//! network, through the public `build_network` entry point.

use chrono::NaiveDate;
use holdnet::corpus::HoldingsTable;
use holdnet::filing::{HoldingRecord, OptionFlag};
use holdnet::pipeline::{build_network, BuildError, NetworkParams};
use holdnet::similarity::Linkage;

fn record(owner: &str, cusip: &str, value: u64) -> HoldingRecord {
    HoldingRecord {
        issuer_name: format!("ISSUER {} HOLDINGS CORP", &cusip[..6]),
        cusip: cusip.to_string(),
        value,
        share_amount: value,
        option_flag: OptionFlag::None,
        owner_name: format!("FUND {owner}"),
        owner_id: owner.to_string(),
        report_date: NaiveDate::from_ymd_opt(2017, 12, 31).unwrap(),
    }
}

/// Owner A holds only issuer X, B splits 50/50 across X and Y, C holds
/// only Y. Normalized: A:{X:1.0}, B:{X:0.5, Y:0.5}, C:{Y:1.0}.
fn three_owner_table() -> HoldingsTable {
    HoldingsTable::new(vec![
        record("A", "XXXXXX100", 100),
        record("B", "XXXXXX100", 50),
        record("B", "YYYYYY100", 50),
        record("C", "YYYYYY100", 100),
    ])
}

fn params(threshold: f64) -> NetworkParams {
    NetworkParams {
        threshold,
        ..NetworkParams::default()
    }
}

#[test]
fn threshold_04_keeps_all_four_edges() {
    let (network, similarity) = build_network(&three_owner_table(), &params(0.4)).unwrap();

    let mut pairs: Vec<(String, String, f64)> = network
        .edges
        .iter()
        .map(|e| {
            (
                e.investor.clone(),
                e.issuer.clone(),
                // Round-trip back to the normalized-value scale.
                e.raw_weight.powf(0.4),
            )
        })
        .collect();
    pairs.sort_by(|a, b| (a.0.as_str(), a.1.as_str()).cmp(&(b.0.as_str(), b.1.as_str())));

    assert_eq!(pairs.len(), 4);
    assert_eq!(pairs[0].0, "A");
    assert_eq!(pairs[0].1, "XXXXXX");
    assert!((pairs[0].2 - 1.0).abs() < 1e-9);
    assert_eq!(pairs[1].0, "B");
    assert!((pairs[1].2 - 0.5).abs() < 1e-9);
    assert_eq!(pairs[2].0, "B");
    assert!((pairs[2].2 - 0.5).abs() < 1e-9);
    assert_eq!(pairs[3].0, "C");
    assert_eq!(pairs[3].1, "YYYYYY");
    assert!((pairs[3].2 - 1.0).abs() < 1e-9);

    assert_eq!(similarity.len(), 3);
}

#[test]
fn threshold_06_keeps_only_the_two_full_positions() {
    let (network, _) = build_network(&three_owner_table(), &params(0.6)).unwrap();
    let pairs: Vec<(&str, &str)> = network
        .edges
        .iter()
        .map(|e| (e.investor.as_str(), e.issuer.as_str()))
        .collect();
    assert_eq!(pairs.len(), 2);
    assert!(pairs.contains(&("A", "XXXXXX")));
    assert!(pairs.contains(&("C", "YYYYYY")));
}

#[test]
fn impossible_threshold_is_empty_not_an_error() {
    let (network, similarity) = build_network(&three_owner_table(), &params(1.01)).unwrap();
    assert!(network.nodes.is_empty());
    assert!(network.edges.is_empty());
    // The similarity matrix is independent of the threshold.
    assert_eq!(similarity.len(), 3);
}

#[test]
fn similarity_matrix_is_symmetric_with_unit_diagonal() {
    let (_, similarity) = build_network(&three_owner_table(), &params(0.4)).unwrap();
    let n = similarity.len();
    for i in 0..n {
        assert_eq!(similarity.get(i, i), 1.0);
        for j in 0..n {
            assert!((similarity.get(i, j) - similarity.get(j, i)).abs() < 1e-12);
        }
    }
}

#[test]
fn same_inputs_same_outputs() {
    let table = three_owner_table();
    let p = params(0.4);
    let (net_a, sim_a) = build_network(&table, &p).unwrap();
    let (net_b, sim_b) = build_network(&table, &p).unwrap();
    assert_eq!(net_a, net_b);
    assert_eq!(sim_a, sim_b);
}

#[test]
fn every_linkage_criterion_builds() {
    for linkage in [
        Linkage::Single,
        Linkage::Complete,
        Linkage::Centroid,
        Linkage::Ward,
    ] {
        let p = NetworkParams {
            linkage,
            ..params(0.4)
        };
        let (_, similarity) = build_network(&three_owner_table(), &p).unwrap();
        let mut ids = similarity.owner_ids.clone();
        ids.sort();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }
}

#[test]
fn single_owner_fails_with_insufficient_data() {
    let table = HoldingsTable::new(vec![record("A", "XXXXXX100", 100)]);
    match build_network(&table, &params(0.4)) {
        Err(BuildError::InsufficientData(_)) => {}
        other => panic!("expected InsufficientData, got {other:?}"),
    }
}

#[test]
fn invalid_parameters_fail_with_config_error() {
    let table = three_owner_table();
    for bad in [
        NetworkParams {
            threshold: -0.1,
            ..NetworkParams::default()
        },
        NetworkParams {
            gravity: 0.0,
            ..NetworkParams::default()
        },
        NetworkParams {
            year: 1999,
            ..NetworkParams::default()
        },
    ] {
        assert!(matches!(
            build_network(&table, &bad),
            Err(BuildError::Config(_))
        ));
    }
}

#[test]
fn option_positions_never_reach_the_network() {
    let mut call = record("A", "ZZZZZZ100", 100_000);
    call.option_flag = OptionFlag::Call;
    let mut records = three_owner_table().records().to_vec();
    records.push(call);
    let table = HoldingsTable::new(records);

    let (network, _) = build_network(&table, &params(0.4)).unwrap();
    assert!(network.node("ZZZZZZ").is_none());
}
