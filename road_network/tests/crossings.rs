use geom::Pt2D;
use road_network::{
    find_crossings, find_intersections, group_intersections, ContactPoint, LaneSection, Link,
    RoadNetwork, Segment, SplineID, Topology, TopologyConfig, TopologyError,
};

fn topology(config: TopologyConfig) -> Topology {
    netutil::logger::setup();
    Topology::new(config).unwrap()
}

fn add_straight(
    topology: &Topology,
    network: &mut RoadNetwork,
    name: &str,
    from: (f64, f64),
    to: (f64, f64),
) -> SplineID {
    let (id, _) = topology
        .add_spline(
            network,
            name,
            vec![Pt2D::new(from.0, from.1), Pt2D::new(to.0, to.1)],
            10.0,
            LaneSection::driving(1, 1, 3.5),
        )
        .unwrap();
    id
}

fn connectors(network: &RoadNetwork) -> usize {
    network
        .all_roads()
        .values()
        .filter(|r| r.is_connector())
        .count()
}

#[test]
fn perpendicular_crossing() {
    let topology = topology(TopologyConfig::default());
    let mut network = RoadNetwork::new();
    let horiz = add_straight(&topology, &mut network, "horiz", (-100.0, 0.0), (100.0, 0.0));
    assert_eq!(network.all_roads().len(), 1);
    assert!(network.all_junctions().is_empty());

    let (vert, report) = topology
        .add_spline(
            &mut network,
            "vert",
            vec![Pt2D::new(0.0, -100.0), Pt2D::new(0.0, 100.0)],
            10.0,
            LaneSection::driving(1, 1, 3.5),
        )
        .unwrap();

    // The detector and grouper on their own
    let records = find_intersections(&network, vert, 1.0).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].point.approx_eq(Pt2D::new(0.0, 0.0), 1e-6));
    let groups = group_intersections(&records, 10.0);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].splines().len(), 2);

    assert_eq!(report.junctions_created.len(), 1);
    assert!(report.warnings.is_empty());
    let junction = network.all_junctions().values().next().unwrap();
    assert!(junction.auto);
    assert_eq!(junction.arm_roads().len(), 4);
    // Every arm to every other arm
    assert_eq!(junction.connections.len(), 12);
    assert!(junction.connections.iter().all(|c| c.lane_links.len() == 1));
    assert_eq!(connectors(&network), 12);

    // Half-width of the other road plus the margin on each side
    let segments = network.get_s(horiz).segments.to_ordered_list();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].0, 0.0);
    assert!((segments[1].0 - 95.5).abs() < 1e-6);
    assert!((segments[2].0 - 104.5).abs() < 1e-6);
    assert_eq!(segments[1].1, Segment::Junction(junction.id));

    // The roads on either side stop at the junction
    let before = match segments[0].1 {
        Segment::Road(r) => network.get_r(r),
        Segment::Junction(_) => panic!("expected a road first"),
    };
    assert_eq!(before.successor, Some(Link::Junction(junction.id)));
    assert!((before.length() - 95.5).abs() < 1e-6);
    assert!(before
        .endpoint(ContactPoint::End)
        .unwrap()
        .approx_eq(Pt2D::new(-4.5, 0.0), 1e-6));

    // Every connector road starts and ends where its arms do
    for c in &junction.connections {
        let connector = network.get_r(c.connecting_road);
        let start = network
            .get_r(c.incoming_road)
            .endpoint(c.incoming_contact)
            .unwrap();
        let end = network
            .get_r(c.outgoing_road)
            .endpoint(c.outgoing_contact)
            .unwrap();
        assert!(connector
            .endpoint(ContactPoint::Start)
            .unwrap()
            .approx_eq(start, 1e-6));
        assert!(connector
            .endpoint(ContactPoint::End)
            .unwrap()
            .approx_eq(end, 1e-3));
    }
}

#[test]
fn crossing_at_the_end_of_a_spline() {
    let topology = topology(TopologyConfig::default());
    let mut network = RoadNetwork::new();
    add_straight(&topology, &mut network, "main", (-100.0, 0.0), (100.0, 0.0));
    let side = add_straight(&topology, &mut network, "side", (0.0, -100.0), (0.0, 0.0));

    let junction = network.all_junctions().values().next().unwrap();
    assert_eq!(junction.arm_roads().len(), 3);
    assert_eq!(junction.connections.len(), 6);

    // The junction is the last segment of the side road
    let segments = network.get_s(side).segments.to_ordered_list();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1].1, Segment::Junction(junction.id));
}

#[test]
fn parallel_roads_dont_cross() {
    let topology = topology(TopologyConfig::default());
    let mut network = RoadNetwork::new();
    let a = add_straight(&topology, &mut network, "a", (0.0, 0.0), (100.0, 0.0));
    let b = add_straight(&topology, &mut network, "b", (0.0, 8.0), (100.0, 8.0));
    assert!(network.all_junctions().is_empty());
    assert!(find_crossings(
        &network.get_s(a).reference_line,
        &network.get_s(b).reference_line,
        1.0
    )
    .is_empty());
}

#[test]
fn nearby_crossing_merges_into_existing_junction() {
    let topology = topology(TopologyConfig {
        merge_distance: 5.0,
        ..TopologyConfig::default()
    });
    let mut network = RoadNetwork::new();
    add_straight(&topology, &mut network, "main", (-100.0, 0.0), (100.0, 0.0));
    add_straight(&topology, &mut network, "first", (0.0, -100.0), (0.0, 100.0));
    let original = *network.all_junctions().keys().next().unwrap();

    // Crosses the main road 8 away from the first crossing: too far to group, but the junctions
    // would overlap
    let (_, report) = topology
        .add_spline(
            &mut network,
            "second",
            vec![Pt2D::new(8.0, -100.0), Pt2D::new(8.0, 100.0)],
            10.0,
            LaneSection::driving(1, 1, 3.5),
        )
        .unwrap();
    assert!(report.junctions_created.is_empty());
    assert_eq!(
        report.junctions_updated,
        vec![original].into_iter().collect()
    );

    assert_eq!(network.all_junctions().len(), 1);
    let junction = network.get_j(original);
    assert_eq!(junction.arm_roads().len(), 6);
    assert_eq!(junction.connections.len(), 30);
    assert_eq!(connectors(&network), 30);
}

#[test]
fn overlapping_candidates_are_ambiguous() {
    let topology = topology(TopologyConfig {
        merge_distance: 5.0,
        ..TopologyConfig::default()
    });
    let mut network = RoadNetwork::new();
    add_straight(&topology, &mut network, "first", (0.0, -100.0), (0.0, 100.0));
    add_straight(&topology, &mut network, "second", (8.0, -100.0), (8.0, 100.0));
    let before = network.clone();

    // Crosses both in one pass, producing two candidates that overlap along this road
    let err = topology
        .add_spline(
            &mut network,
            "across",
            vec![Pt2D::new(-100.0, 50.0), Pt2D::new(100.0, 50.0)],
            10.0,
            LaneSection::driving(1, 1, 3.5),
        )
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TopologyError>(),
        Some(TopologyError::AmbiguousMerge(_))
    ));
    // Nothing was applied
    assert_eq!(network, before);
}
