// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    file = { "File", PoiKind::File },
    function = { "Function", PoiKind::Function },
    class = { "Class", PoiKind::Class },
    method = { "Method", PoiKind::Method },
    variable = { "Variable", PoiKind::Variable },
    table = { "Table", PoiKind::Table },
    package = { "Package", PoiKind::Package },
    interface = { "Interface", PoiKind::Interface },
)]
fn kind_round_trips_through_label(label: &str, kind: PoiKind) {
    assert_eq!(kind.as_label(), label);
    assert_eq!(label.parse::<PoiKind>().unwrap(), kind);
}

#[test]
fn unknown_kind_is_rejected() {
    let err = "Gadget".parse::<PoiKind>().unwrap_err();
    assert_eq!(err, UnknownKind("Gadget".to_string()));
}

#[test]
fn qualified_name_entity_format() {
    let qn = QualifiedName::entity("/src/a.js", "foo");
    assert_eq!(qn.as_str(), "/src/a.js--foo");
    assert_eq!(qn.scope(), "/src/a.js");
}

#[test]
fn qualified_name_module_format() {
    let qn = QualifiedName::module("lodash");
    assert_eq!(qn.as_str(), "lodash--lodash");
    assert_eq!(qn.scope(), "lodash");
}

#[test]
fn poi_new_derives_stable_id() {
    let run = RunId::from_string("run-fixed");
    let file = FileId::from_string("fil-1");
    let a = Poi::new(
        run,
        file,
        PoiKind::Function,
        "foo",
        QualifiedName::entity("/src/a.js", "foo"),
        1,
        4,
    );
    let b = Poi::new(
        run,
        file,
        PoiKind::Function,
        "foo",
        QualifiedName::entity("/src/a.js", "foo"),
        1,
        4,
    );
    assert_eq!(a.id, b.id);
}

#[test]
fn poi_serde_skips_missing_signature() {
    let poi = PoiBuilder::default().build();
    let json = serde_json::to_string(&poi).unwrap();
    assert!(!json.contains("signature"));

    let with_sig = PoiBuilder::default().signature("fn foo()").build();
    let json = serde_json::to_string(&with_sig).unwrap();
    assert!(json.contains("signature"));
}
