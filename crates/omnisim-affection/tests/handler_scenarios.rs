use omnisim_affection::AffectionEngine;
use omnisim_affection::tripwire::TripwireState;
use omnisim_spatial::{Catalog, World};
use omnisim_types::{
    CatalogEntry, EnvironmentBaseline, MountOffset, NodeClass, NodeId, Point, Pose, PoseUpdate,
    Properties, PropertyValue, Reading, Shape, WorldEvent,
};

fn props(range: f64) -> Properties {
    Properties {
        range: Some(range),
        ..Properties::default()
    }
}

fn node(class: NodeClass, kind: &str, name: &str, pose: Pose, properties: Properties) -> CatalogEntry {
    CatalogEntry::new(class, name)
        .with_subtype(kind)
        .with_pose(pose)
        .with_properties(properties)
}

fn setup(entries: Vec<CatalogEntry>) -> (AffectionEngine, World) {
    let catalog = Catalog::from_entries(entries).unwrap();
    let engine = AffectionEngine::for_catalog(&catalog, 7).unwrap();
    (engine, World::new(catalog))
}

fn baseline() -> EnvironmentBaseline {
    EnvironmentBaseline::default()
}

#[test]
fn thermostat_warms_temperature_sensor() {
    let mut thermostat = props(50.0);
    thermostat.target_value = Some(25.0);
    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "temperature", "te_1", Pose::new(520.0, 415.0, -180.0), Properties::default()),
        node(NodeClass::Actuator, "thermostat", "th_1", Pose::new(500.0, 415.0, 0.0), thermostat),
    ]);

    match engine.evaluate(&world, NodeId(0), &baseline(), 0, 0.0).unwrap() {
        Reading::Scalar {
            value,
            contributions,
            ..
        } => {
            assert_eq!(contributions.len(), 1);
            assert!((contributions[0].distance - 20.0).abs() < 1e-9);
            assert!((contributions[0].weight - 0.6).abs() < 1e-9);
            assert!((value - 35.0).abs() < 1e-9);
        }
        other => panic!("unexpected reading {other:?}"),
    }
}

#[test]
fn no_influencer_reports_ambient() {
    let (engine, world) = setup(vec![node(
        NodeClass::Sensor,
        "humidity",
        "hu_1",
        Pose::origin(),
        Properties::default(),
    )]);
    let reading = engine.evaluate(&world, NodeId(0), &baseline(), 0, 0.0).unwrap();
    assert_eq!(reading.scalar(), Some(50.0));
}

#[test]
fn camera_detects_qr_code_in_view() {
    let mut eye = props(10.0);
    eye.fov = Some(60.0);
    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "camera", "ca_1", Pose::new(2.0, 6.0, 180.0), eye),
        node(NodeClass::Actor, "qrcode", "qr_1", Pose::new(1.0, 6.0, 0.0), Properties::default()),
        node(NodeClass::Actor, "qrcode", "qr_2", Pose::new(3.0, 6.0, 0.0), Properties::default()),
    ]);
    let light = EnvironmentBaseline {
        luminosity: 60.0,
        ..baseline()
    };

    match engine.evaluate(&world, NodeId(0), &light, 0, 0.0).unwrap() {
        Reading::Camera {
            detections,
            luminosity,
            dropped,
        } => {
            assert_eq!(detections.len(), 1);
            let qr = &detections[&NodeId(1)];
            assert_eq!(qr.identity.name, "qr_1");
            assert!((qr.distance - 1.0).abs() < 1e-9);
            assert_eq!(luminosity, 60.0);
            assert_eq!(dropped, 0);
        }
        other => panic!("unexpected reading {other:?}"),
    }
}

#[test]
fn camera_is_blind_in_darkness() {
    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "camera", "ca_1", Pose::origin(), props(10.0)),
        node(NodeClass::Actor, "human", "hu_1", Pose::new(1.0, 0.0, 0.0), Properties::default()),
    ]);
    let dark = EnvironmentBaseline {
        luminosity: 0.0,
        ..baseline()
    };
    match engine.evaluate(&world, NodeId(0), &dark, 0, 0.0).unwrap() {
        Reading::Camera {
            detections,
            dropped,
            ..
        } => {
            assert!(detections.is_empty());
            assert_eq!(dropped, 1);
        }
        other => panic!("unexpected reading {other:?}"),
    }
}

fn led(luminosity: f64) -> Properties {
    let mut p = props(5.0);
    p.set_number("luminosity", luminosity);
    p
}

#[test]
fn led_on_lit_room_saturates_light_sensor() {
    // LED emitting 40 at full weight into ambient 60: raw 100, blended 106.
    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "luminosity", "li_1", Pose::origin(), Properties::default()),
        node(NodeClass::Actuator, "led", "led_1", Pose::origin(), led(40.0)),
    ]);
    let ambient = EnvironmentBaseline {
        luminosity: 60.0,
        ..baseline()
    };
    match engine.evaluate(&world, NodeId(0), &ambient, 0, 0.0).unwrap() {
        Reading::Scalar {
            value,
            contributions,
            ..
        } => {
            assert_eq!(contributions.len(), 1);
            assert_eq!(contributions[0].weight, 1.0);
            assert_eq!(contributions[0].attenuated_value, 40.0);
            assert_eq!(value, 100.0);
        }
        other => panic!("unexpected reading {other:?}"),
    }
}

#[test]
fn dim_led_adds_to_dark_room() {
    // LED at half range: weight 0.5, contributes 10 into ambient 20.
    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "light", "li_1", Pose::origin(), Properties::default()),
        node(NodeClass::Actuator, "led", "led_1", Pose::new(2.5, 0.0, 0.0), led(20.0)),
    ]);
    let ambient = EnvironmentBaseline {
        luminosity: 20.0,
        ..baseline()
    };
    let value = engine
        .evaluate(&world, NodeId(0), &ambient, 0, 0.0)
        .unwrap()
        .scalar()
        .unwrap();
    // raw 30, blended 20 · 0.1 + 30
    assert!((value - 32.0).abs() < 1e-9);
}

fn tripwire_world() -> (AffectionEngine, World) {
    let mut beam = Properties::default();
    beam.shape = Some(Shape::Line {
        start: Point::new(0.0, 0.0),
        end: Point::new(10.0, 0.0),
    });
    let mut chassis = Properties::default();
    chassis.shape = Some(Shape::Square { length: 5.0 });

    setup(vec![
        node(NodeClass::Sensor, "linear_alarm", "la_1", Pose::origin(), beam),
        CatalogEntry::new(NodeClass::Composite, "rb_1")
            .with_type("robot")
            .with_pose(Pose::new(5.0, -2.0, 0.0))
            .with_properties(chassis.clone()),
        CatalogEntry::new(NodeClass::Composite, "rb_2")
            .with_type("robot")
            .with_pose(Pose::new(50.0, 50.0, 0.0))
            .with_properties(chassis),
    ])
}

#[test]
fn robot_crossing_beam_trips_linear_alarm() {
    let (engine, mut world) = tripwire_world();

    match engine.evaluate(&world, NodeId(0), &baseline(), 1, 0.1).unwrap() {
        Reading::LinearAlarm { triggered, hits } => {
            assert!(triggered);
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].robot, NodeId(1));
            assert_eq!(hits[0].previous, Point::new(5.0, -2.0));
            assert_eq!(hits[0].current, Point::new(5.0, -2.0));
        }
        other => panic!("unexpected reading {other:?}"),
    }

    world
        .apply(&WorldEvent::Pose(PoseUpdate {
            node: NodeId(1),
            x: 5.0,
            y: 2.0,
            theta: 0.0,
        }))
        .unwrap();

    match engine.evaluate(&world, NodeId(0), &baseline(), 2, 0.2).unwrap() {
        Reading::LinearAlarm { triggered, hits } => {
            assert!(triggered);
            assert_eq!(hits[0].previous, Point::new(5.0, -2.0));
            assert_eq!(hits[0].current, Point::new(5.0, 2.0));
        }
        other => panic!("unexpected reading {other:?}"),
    }

    // The far robot is tracked but never hits.
    assert!(matches!(
        engine.tripwire_state(NodeId(0), NodeId(2)),
        TripwireState::Tracked { .. }
    ));
}

#[test]
fn re_evaluating_same_tick_keeps_previous() {
    let (engine, mut world) = tripwire_world();
    engine.evaluate(&world, NodeId(0), &baseline(), 1, 0.1);
    world
        .apply(&WorldEvent::Pose(PoseUpdate {
            node: NodeId(1),
            x: 5.0,
            y: 1.0,
            theta: 0.0,
        }))
        .unwrap();
    engine.evaluate(&world, NodeId(0), &baseline(), 2, 0.2);
    engine.evaluate(&world, NodeId(0), &baseline(), 2, 0.2);

    assert_eq!(
        engine.tripwire_state(NodeId(0), NodeId(1)),
        TripwireState::Tracked {
            previous: Point::new(5.0, -2.0),
            current: Point::new(5.0, 1.0),
            last_tick: 2,
        }
    );
}

#[test]
fn robot_in_area_triggers_area_alarm() {
    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "area_alarm", "aa_1", Pose::origin(), props(3.0)),
        CatalogEntry::new(NodeClass::Composite, "rb_1")
            .with_type("robot")
            .with_pose(Pose::new(2.0, 0.0, 0.0)),
        CatalogEntry::new(NodeClass::Composite, "rb_2")
            .with_type("robot")
            .with_pose(Pose::new(10.0, 0.0, 0.0)),
    ]);
    match engine.evaluate(&world, NodeId(0), &baseline(), 0, 0.0).unwrap() {
        Reading::AreaAlarm { triggered, robots } => {
            assert!(triggered);
            assert_eq!(robots.len(), 1);
            assert_eq!(robots[0].name, "rb_1");
        }
        other => panic!("unexpected reading {other:?}"),
    }
}

#[test]
fn sonar_ignores_its_own_chassis() {
    let robot = CatalogEntry::new(NodeClass::Composite, "rb_1")
        .with_type("robot")
        .with_pose(Pose::origin())
        .with_child(
            CatalogEntry::new(NodeClass::Sensor, "so_1")
                .with_subtype("sonar")
                .with_mount(MountOffset::new(0.5, 0.0, 0.0))
                .with_properties(props(10.0)),
        );
    let (engine, world) = setup(vec![
        robot,
        CatalogEntry::new(NodeClass::Obstacle, "wall")
            .with_pose(Pose::new(4.0, 0.0, 0.0)),
        CatalogEntry::new(NodeClass::Obstacle, "far_wall")
            .with_pose(Pose::new(7.0, 0.0, 0.0)),
    ]);
    match engine.evaluate(&world, NodeId(1), &baseline(), 0, 0.0).unwrap() {
        Reading::Distance { value, nearest } => {
            assert!((value - 3.5).abs() < 1e-9);
            assert_eq!(nearest.unwrap().identity.name, "wall");
        }
        other => panic!("unexpected reading {other:?}"),
    }
}

#[test]
fn sonar_reports_max_range_when_clear() {
    let (engine, world) = setup(vec![node(
        NodeClass::Sensor,
        "distance",
        "so_1",
        Pose::origin(),
        props(6.0),
    )]);
    let reading = engine.evaluate(&world, NodeId(0), &baseline(), 0, 0.0).unwrap();
    assert_eq!(reading.scalar(), Some(6.0));
}

#[test]
fn rfid_signal_strength_follows_weight() {
    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "rfid", "rf_1", Pose::origin(), props(4.0)),
        node(NodeClass::Actor, "rfidtag", "tag_1", Pose::new(1.0, 0.0, 0.0), Properties::default()),
    ]);
    match engine.evaluate(&world, NodeId(0), &baseline(), 0, 0.0).unwrap() {
        Reading::Rfid { tags } => {
            assert_eq!(tags.len(), 1);
            assert!((tags[0].signal_strength - 75.0).abs() < 1e-9);
        }
        other => panic!("unexpected reading {other:?}"),
    }
}

#[test]
fn humans_are_heard_only_while_making_sound() {
    let mut speaker = props(5.0);
    speaker.value = Some(30.0);
    let mut human = props(5.0);
    human.value = Some(50.0);
    human
        .extra
        .insert("sound".to_string(), PropertyValue::Flag(false));

    let entries = |human: Properties| {
        vec![
            node(NodeClass::Sensor, "microphone", "mi_1", Pose::origin(), Properties::default()),
            node(NodeClass::Actuator, "speaker", "sp_1", Pose::origin(), speaker.clone()),
            node(NodeClass::Actor, "human", "hu_1", Pose::origin(), human),
        ]
    };
    let quiet = EnvironmentBaseline {
        sound: 10.0,
        ..baseline()
    };

    let (engine, world) = setup(entries(human.clone()));
    let value = engine.evaluate(&world, NodeId(0), &quiet, 0, 0.0).unwrap().scalar();
    assert_eq!(value, Some(30.0));

    human
        .extra
        .insert("sound".to_string(), PropertyValue::Flag(true));
    let (engine, world) = setup(entries(human));
    let value = engine.evaluate(&world, NodeId(0), &quiet, 0, 0.0).unwrap().scalar();
    assert_eq!(value, Some(40.0));
}

#[test]
fn envcombo_reports_three_phenomena() {
    let mut fire = props(10.0);
    fire.set_number("temperature", 100.0);
    fire.set_number("gas", 10.0);
    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "envcombo", "ec_1", Pose::origin(), Properties::default()),
        node(NodeClass::Actor, "fire", "fi_1", Pose::origin(), fire),
    ]);
    match engine.evaluate(&world, NodeId(0), &baseline(), 0, 0.0).unwrap() {
        Reading::Combo {
            temperature,
            humidity,
            gas,
        } => {
            assert_eq!(temperature, 120.0);
            assert_eq!(humidity, 50.0);
            assert_eq!(gas, 10.0);
        }
        other => panic!("unexpected reading {other:?}"),
    }
}

#[test]
fn generic_sensor_uses_affects() {
    let mut source = props(10.0);
    source.value = Some(5.0);
    source.affects.insert("radiation".to_string());
    let mut ambient = baseline();
    ambient.extra.insert("radiation".to_string(), 1.0);

    let (engine, world) = setup(vec![
        node(NodeClass::Sensor, "radiation", "ra_1", Pose::origin(), Properties::default()),
        node(NodeClass::Actor, "barrel", "ba_1", Pose::origin(), source),
        node(NodeClass::Actor, "rock", "ro_1", Pose::origin(), props(10.0)),
    ]);
    match engine.evaluate(&world, NodeId(0), &ambient, 0, 0.0).unwrap() {
        Reading::Generic {
            phenomenon,
            value,
            contributions,
        } => {
            assert_eq!(phenomenon, "radiation");
            assert_eq!(contributions.len(), 1);
            assert_eq!(value, 6.0);
        }
        other => panic!("unexpected reading {other:?}"),
    }
}
