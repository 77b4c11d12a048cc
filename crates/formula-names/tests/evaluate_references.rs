use formula_names::{
    EvalOptions, ExternSheetB57, ExternSheetTypeB57, FormulaContext, OperandKind, OperandValue,
    Ref3D, ReferenceStyle, SupBookKind,
};
use pretty_assertions::assert_eq;

mod common;

use common::rgce_builder::{
    biff8_context, sheet_names, table, xti, Rgce, CLASS_REF, CLASS_VALUE, PTG_LIST, PTG_PAREN,
    PTG_RANGE,
};

fn evaluate(ctx: &FormulaContext, tokens: Vec<u8>) -> formula_names::NameTable {
    let mut names = table(vec![("Ref", tokens)]);
    names
        .evaluate(ctx, 0, &EvalOptions::default())
        .expect("evaluate");
    names
}

#[test]
fn relative_reference_renders_as_offsets() {
    let names = evaluate(&biff8_context(), Rgce::new().ref8(CLASS_REF, 0, 0, true, true).build());
    let name = names.get(0).unwrap();
    let result = name.result().unwrap();

    assert_eq!(result.text, "RC");
    assert_eq!(result.kind, OperandKind::RelativeReference);
    assert_eq!(
        result.references(),
        Some(&[Ref3D::current_sheet((0, 1), (0, 1), (true, true), (true, true))][..])
    );
    assert!(name.any_relative());
    assert!(!name.any_error());
}

#[test]
fn negative_offsets_wrap_at_field_width() {
    let names = evaluate(&biff8_context(), Rgce::new().ref8(CLASS_REF, 1, -2, true, true).build());
    assert_eq!(names.get(0).unwrap().result().unwrap().text, "R[1]C[-2]");
}

#[test]
fn value_class_local_reference_has_no_value() {
    let names = evaluate(&biff8_context(), Rgce::new().ref8(CLASS_VALUE, 2, 1, false, false).build());
    let name = names.get(0).unwrap();
    let result = name.result().unwrap();
    assert_eq!(result.text, "$B$3");
    assert_eq!(result.kind, OperandKind::Unknown);
    assert_eq!(result.value, None);
    assert!(name.any_relative());
}

#[test]
fn absolute_3d_area_across_sheets() {
    let tokens = Rgce::new().area3d8(CLASS_REF, 0, (0, 2), (0, 1)).build();
    let names = evaluate(&biff8_context(), tokens);
    let name = names.get(0).unwrap();
    let result = name.result().unwrap();

    assert_eq!(result.text, "Sheet1:Sheet2!$A$1:$B$3");
    assert_eq!(result.kind, OperandKind::Reference);
    assert_eq!(
        result.value,
        Some(OperandValue::References(vec![Ref3D::new([0, 2, 0, 3, 0, 2])]))
    );
    assert!(!name.any_relative());
    assert!(!name.any_error());
    assert!(name.area2d(None).is_err(), "spans two sheets");
}

#[test]
fn single_sheet_cell_exposes_coordinates() {
    let tokens = Rgce::new().ref3d8(CLASS_REF, 3, 4, 2, false, false).build();
    let names = evaluate(&biff8_context(), tokens);
    let name = names.get(0).unwrap();

    assert_eq!(name.result().unwrap().text, "Sheet2!$C$5");
    assert_eq!(name.single_cell(), Ok((1, 4, 2)));
    assert_eq!(name.area2d(Some((3, 3))), Ok((1, 3, 3, 2, 3)));
}

#[test]
fn r1c1_style_applies_to_absolute_references() {
    let ctx = biff8_context();
    let mut names = table(vec![("Ref", Rgce::new().ref3d8(CLASS_REF, 3, 4, 2, false, false).build())]);
    let options = EvalOptions {
        reference_style: ReferenceStyle::R1C1,
        ..EvalOptions::default()
    };
    let result = names.evaluate(&ctx, 0, &options).unwrap().unwrap();
    assert_eq!(result.text, "Sheet2!R5C3");
}

#[test]
fn relative_3d_reference_keeps_its_sheet() {
    let tokens = Rgce::new().ref3d8(CLASS_REF, 3, 0, 0, true, true).build();
    let names = evaluate(&biff8_context(), tokens);
    let name = names.get(0).unwrap();
    let result = name.result().unwrap();

    assert_eq!(result.text, "Sheet2!RC");
    assert_eq!(result.kind, OperandKind::RelativeReference);
    assert!(name.any_relative());
}

#[test]
fn value_class_3d_reference_has_text_only() {
    let tokens = Rgce::new().ref3d8(CLASS_VALUE, 3, 0, 0, false, false).build();
    let names = evaluate(&biff8_context(), tokens);
    let result = names.get(0).unwrap().result().unwrap();
    assert_eq!(result.kind, OperandKind::Reference);
    assert_eq!(result.value, None);
    assert_eq!(result.text, "Sheet2!$A$1");
}

#[test]
fn deleted_sheet_is_an_error() {
    let tokens = Rgce::new().ref3d8(CLASS_REF, 1, 4, 2, false, false).build();
    let names = evaluate(&biff8_context(), tokens);
    let name = names.get(0).unwrap();
    assert!(name.any_error());
    assert_eq!(
        name.result().unwrap().text,
        "'internal; deleted sheet'!$C$5"
    );
    let coords = name.result().unwrap().references().unwrap()[0].coords;
    assert_eq!((coords[0], coords[1]), (-2, -1));
}

#[test]
fn any_sheet_is_not_an_error() {
    let tokens = Rgce::new().ref3d8(CLASS_REF, 2, 0, 0, false, false).build();
    let names = evaluate(&biff8_context(), tokens);
    let name = names.get(0).unwrap();
    assert!(!name.any_error());
    assert_eq!(name.result().unwrap().text, "'?internal; any sheet?'!$A$1");
}

#[test]
fn out_of_range_ixti_is_an_error() {
    let tokens = Rgce::new().ref3d8(CLASS_REF, 9, 0, 0, false, false).build();
    let names = evaluate(&biff8_context(), tokens);
    let name = names.get(0).unwrap();
    assert!(name.any_error());
    assert!(name.result().unwrap().text.contains("?error -101?"));
}

#[test]
fn external_workbook_reference_is_flagged() {
    let ctx = FormulaContext::new(80, 1200, sheet_names(&["Sheet1"]))
        .unwrap()
        .with_supbooks(vec![SupBookKind::Internal, SupBookKind::External])
        .with_externsheet(vec![xti(0, 0, 0), xti(1, 0, 0)]);
    let names = evaluate(&ctx, Rgce::new().ref3d8(CLASS_REF, 1, 0, 0, false, false).build());
    let name = names.get(0).unwrap();
    assert!(name.any_external());
    assert!(name.any_error());
    assert_eq!(name.result().unwrap().text, "<<external>>!$A$1");
}

#[test]
fn macro_sheets_map_to_the_macro_sentinel() {
    let ctx = FormulaContext::new(80, 1200, sheet_names(&["Data"]))
        .unwrap()
        .with_all_sheets_map(vec![-1, 0])
        .with_supbooks(vec![SupBookKind::Internal])
        .with_externsheet(vec![xti(0, 0, 0), xti(0, 1, 1)]);

    let names = evaluate(&ctx, Rgce::new().ref3d8(CLASS_REF, 1, 0, 0, false, false).build());
    assert_eq!(names.get(0).unwrap().result().unwrap().text, "Data!$A$1");

    let names = evaluate(&ctx, Rgce::new().ref3d8(CLASS_REF, 0, 0, 0, false, false).build());
    let name = names.get(0).unwrap();
    assert!(name.any_error());
    assert_eq!(name.result().unwrap().text, "'internal; macro sheet'!$A$1");
}

#[test]
fn biff7_3d_reference_carries_sheets_inline() {
    let ctx = FormulaContext::new(70, 1252, sheet_names(&["Sheet1", "Sheet2"])).unwrap();
    let names = evaluate(&ctx, Rgce::new().ref3d5(CLASS_REF, -1, (0, 1), 3, 1).build());
    let name = names.get(0).unwrap();
    let result = name.result().unwrap();
    assert_eq!(result.text, "Sheet1:Sheet2!$B$4");
    assert_eq!(
        result.value,
        Some(OperandValue::References(vec![Ref3D::new([0, 2, 3, 4, 1, 2])]))
    );
    assert!(!name.any_error());

    let names = evaluate(&ctx, Rgce::new().ref3d5(CLASS_REF, 2, (0, 0), 3, 1).build());
    let name = names.get(0).unwrap();
    assert!(name.any_external());
    assert_eq!(name.result().unwrap().text, "<<external>>!$B$4");

    let names = evaluate(&ctx, Rgce::new().ref3d5(CLASS_REF, -1, (-1, -1), 3, 1).build());
    assert!(names.get(0).unwrap().any_error());

    let names = evaluate(&ctx, Rgce::new().ref3d5(CLASS_REF, -1, (0, 5), 3, 1).build());
    let name = names.get(0).unwrap();
    assert!(name.any_error());
    assert!(name.result().unwrap().text.contains("?error -103?"));
}

#[test]
fn union_of_references_keeps_every_box() {
    let tokens = Rgce::new()
        .ref3d8(CLASS_REF, 3, 0, 0, false, false)
        .ref3d8(CLASS_REF, 3, 4, 2, false, false)
        .op(PTG_LIST)
        .op(PTG_PAREN)
        .build();
    let names = evaluate(&biff8_context(), tokens);
    let result = names.get(0).unwrap().result().unwrap();
    assert_eq!(result.text, "Sheet2!$A$1,Sheet2!$C$5");
    assert_eq!(result.kind, OperandKind::Reference);
    assert_eq!(result.references().map(<[Ref3D]>::len), Some(2));
}

#[test]
fn range_operator_builds_the_bounding_box() {
    let tokens = Rgce::new()
        .ref3d8(CLASS_REF, 3, 0, 0, false, false)
        .ref3d8(CLASS_REF, 3, 4, 2, false, false)
        .op(PTG_RANGE)
        .build();
    let names = evaluate(&biff8_context(), tokens);
    let name = names.get(0).unwrap();
    assert_eq!(name.result().unwrap().text, "Sheet2!$A$1:Sheet2!$C$5");
    assert_eq!(name.area2d(None), Ok((1, 0, 5, 0, 3)));
}

#[test]
fn mixing_relative_and_absolute_in_a_range_is_reported() {
    let tokens = Rgce::new()
        .ref3d8(CLASS_REF, 3, 0, 0, false, false)
        .ref8(CLASS_REF, 0, 0, true, true)
        .op(PTG_RANGE)
        .build();
    let names = evaluate(&biff8_context(), tokens);
    let name = names.get(0).unwrap();
    assert_eq!(name.result().unwrap().kind, OperandKind::Unknown);
    assert_eq!(name.warnings().len(), 1);
}

#[test]
fn biff7_externsheet_without_own_document_is_unsupported_for_namex() {
    let ctx = FormulaContext::new(70, 1252, sheet_names(&["Sheet1"]))
        .unwrap()
        .with_externsheet_b57(vec![ExternSheetB57 {
            kind: ExternSheetTypeB57::OwnSheet,
            sheet_name: Some("Sheet1".to_string()),
        }]);
    let names = evaluate(&ctx, Rgce::new().name_x_b57(-1, 2).build());
    let name = names.get(0).unwrap();
    assert!(name.any_error());
    assert_eq!(
        name.result().unwrap().text,
        "<<Name #1 in external(?) file #-1>>"
    );
}
