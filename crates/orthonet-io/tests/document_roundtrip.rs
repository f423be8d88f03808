use orthonet_core::{AttachmentPoint, NetId, PersistedWire, PinDefinition, Point, Transform, WireSegment};
use orthonet_io::{OwnerPlacement, SchematicDocument};
use uuid::Uuid;

fn sample_document() -> (SchematicDocument, Uuid) {
    let owner = Uuid::new_v4();
    let mut doc = SchematicDocument::new("amplifier");
    doc.placements.push(OwnerPlacement {
        owner,
        transform: Transform::translate(100.0, 50.0),
        pins: vec![PinDefinition::new("IN", -20.0, 0.0), PinDefinition::new("OUT", 20.0, 0.0)],
    });
    doc.wires.push(PersistedWire {
        net: Some(NetId::new()),
        name: Some("VIN".to_string()),
        user_named: true,
        segments: vec![
            WireSegment::new(AttachmentPoint::free(0.0, 50.0), AttachmentPoint::free(40.0, 50.0)),
            WireSegment::new(AttachmentPoint::free(40.0, 50.0), AttachmentPoint::pin(owner, "IN")),
        ],
    });
    doc.wires.push(PersistedWire {
        net: None,
        name: None,
        user_named: false,
        segments: vec![WireSegment::new(
            AttachmentPoint::pin(owner, "OUT"),
            AttachmentPoint::free(120.0, 80.0),
        )],
    });
    (doc, owner)
}

#[test]
fn test_save_load_round_trip() {
    let (doc, _) = sample_document();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("amplifier.onet.json");

    doc.save(&path).unwrap();
    let loaded = SchematicDocument::load(&path).unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn test_open_engine_places_pins_and_keeps_names() {
    let (doc, owner) = sample_document();
    let engine = doc.open_engine().unwrap();

    let pin_in = engine.find_vertex_at(Point::new(80.0, 50.0)).expect("IN placed");
    let vertex = engine.state().vertex(pin_in).unwrap();
    assert!(vertex.ownership.is_pin());
    assert_eq!(vertex.net, doc.wires[0].net);
    assert_eq!(engine.state().pins_of(owner).len(), 2);

    let names: Vec<String> = engine.nets_summary().into_iter().map(|n| n.name).collect();
    assert!(names.contains(&"VIN".to_string()));
    assert_eq!(names.len(), 2);
}

#[test]
fn test_capture_after_edit_persists_new_wire() {
    let (mut doc, _) = sample_document();
    let mut engine = doc.open_engine().unwrap();
    engine
        .connect_points(Point::new(0.0, 0.0), Point::new(0.0, 30.0), Default::default())
        .unwrap();
    doc.capture(&engine);
    assert_eq!(doc.wires.len(), 3);

    let mut buffer = Vec::new();
    doc.write_to(&mut buffer).unwrap();
    let reread = SchematicDocument::read_from(buffer.as_slice()).unwrap();
    assert_eq!(reread.wires, doc.wires);
}
