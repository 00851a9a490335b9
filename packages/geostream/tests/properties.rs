//! Property tests for partitioning, replay order and the frame codec

use geostream::{
    decode, encode, group_by_time, ColumnMap, Dataset, Group, GroupOrder, Identity, KeyCheck,
    Partitioner, Record, TimeKey,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn identity() -> impl Strategy<Value = Identity> {
    prop_oneof![
        (0i64..10_000).prop_map(Identity::Int),
        "[a-z][a-z0-9 ,\"]{0,8}".prop_map(Identity::Text),
    ]
}

fn time_key() -> impl Strategy<Value = TimeKey> {
    prop_oneof![
        any::<i64>().prop_map(TimeKey::Int),
        "[a-z][a-z0-9:-]{0,6}".prop_map(TimeKey::Text),
    ]
}

fn numeric_key() -> impl Strategy<Value = TimeKey> {
    prop_oneof![
        (-1000i64..1000).prop_map(TimeKey::Int),
        (-1000.0f64..1000.0).prop_map(|v| TimeKey::Text(format!("{:?}", v))),
    ]
}

fn numeric_value(key: &TimeKey) -> f64 {
    match key {
        TimeKey::Int(v) => *v as f64,
        TimeKey::Text(text) => text.parse().unwrap(),
    }
}

fn records(max_keys: i64) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(
        (-180.0f64..180.0, -90.0f64..90.0, identity(), 0..max_keys),
        1..60,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(lon, lat, id, t)| Record::new(lon, lat, id, t))
            .collect()
    })
}

proptest! {
    #[test]
    fn partition_covers_every_row_once(rows in records(8), ascending in any::<bool>()) {
        let order = if ascending { GroupOrder::Ascending } else { GroupOrder::FirstSeen };
        let dataset = Dataset::from_records(rows.clone(), &ColumnMap::default()).unwrap();
        let groups = group_by_time(&dataset, order);

        let total: usize = groups.iter().map(Group::len).sum();
        prop_assert_eq!(total, rows.len());

        let keys: HashSet<&TimeKey> = groups.iter().map(|g| &g.key).collect();
        prop_assert_eq!(keys.len(), groups.len());

        for group in &groups {
            prop_assert!(!group.is_empty());
            prop_assert!(group.rows.iter().all(|r| r.time == group.key));

            // Rows keep their dataset order inside a bucket
            let expected: Vec<&Record> = rows.iter().filter(|r| r.time == group.key).collect();
            let actual: Vec<&Record> = group.rows.iter().collect();
            prop_assert_eq!(actual, expected);
        }

        if order == GroupOrder::Ascending {
            prop_assert!(groups.windows(2).all(|w| w[0].key < w[1].key));
        }
    }

    #[test]
    fn ascending_order_follows_numeric_value(
        cells in prop::collection::vec((identity(), numeric_key()), 1..40),
    ) {
        let rows: Vec<Record> = cells
            .into_iter()
            .map(|(id, key)| Record::new(0.0, 0.0, id, key))
            .collect();
        let dataset = Dataset::from_records(rows, &ColumnMap::default()).unwrap();
        let groups = group_by_time(&dataset, GroupOrder::Ascending);

        for pair in groups.windows(2) {
            prop_assert!(numeric_value(&pair[0].key) <= numeric_value(&pair[1].key));
        }
    }

    #[test]
    fn partition_is_deterministic(rows in records(8)) {
        let dataset = Dataset::from_records(rows, &ColumnMap::default()).unwrap();
        let first = group_by_time(&dataset, GroupOrder::FirstSeen);
        let second = group_by_time(&dataset, GroupOrder::FirstSeen);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn replay_wraps_cyclically(rows in records(5), draws in 0usize..40) {
        let dataset = Dataset::from_records(rows, &ColumnMap::default()).unwrap();
        let mut partitioner = Partitioner::new(&dataset, GroupOrder::FirstSeen);
        let groups = partitioner.groups().to_vec();
        let n = groups.len();

        for i in 0..draws {
            let group = partitioner.next_group();
            prop_assert_eq!(&group.key, &groups[i % n].key);
        }
        prop_assert_eq!(partitioner.position(), draws % n);
        prop_assert_eq!(partitioner.cycles(), (draws / n) as u64);
    }

    #[test]
    fn frame_round_trip(
        key in time_key(),
        cells in prop::collection::vec((-180.0f64..180.0, -90.0f64..90.0, identity()), 0..20),
    ) {
        let rows: Vec<Record> = cells
            .into_iter()
            .map(|(lon, lat, id)| Record::new(lon, lat, id, key.clone()))
            .collect();
        let group = Group { key: key.clone(), rows: rows.clone() };

        let wire = encode(&group, &ColumnMap::default()).unwrap().to_wire();
        let prefix = format!("{} ", key);
        prop_assert!(wire.starts_with(&prefix));

        let decoded = decode(&wire, &ColumnMap::default(), KeyCheck::Enforce).unwrap();
        prop_assert_eq!(decoded.key, key);
        prop_assert_eq!(decoded.records, rows);
    }

    #[test]
    fn decode_never_panics(text in ".{0,200}") {
        let _ = decode(&text, &ColumnMap::default(), KeyCheck::Enforce);
    }
}
