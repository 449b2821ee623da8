//! Dragging rows within and between tables.

mod common;

use common::*;
use horizon_outline::prelude::*;

#[test]
fn test_drag_child_to_root_front_is_one_undo() {
    let (mut workspace, window, table, keys) = sheet_workspace();
    view_mut(&mut workspace, table).select_keys(&[keys.mod_1]);

    let payload = workspace.start_drag(table).unwrap();
    assert_eq!(payload.count(), 1);
    assert_eq!(payload.kind(), "Modifier");

    let outcome = workspace
        .drop_rows(table, &payload, Some(DropTarget::root(0)))
        .unwrap();
    assert!(outcome.moved);
    assert_eq!(outcome.inserted.len(), 1);
    assert_eq!(
        names_under(&workspace, table, None),
        ["Mod1", "TraitA", "TraitB"]
    );
    assert!(names_under(&workspace, table, Some("TraitB")).is_empty());
    assert_eq!(
        entry_named(&workspace, table, "Mod1").id,
        outcome.inserted[0],
        "a move keeps the record ID"
    );
    view(&workspace, table).records().check_integrity().unwrap();

    let undo = workspace.undo_manager(window).unwrap();
    assert_eq!(undo.len(), 1);
    assert_eq!(undo.undo_name(), Some("Row Drag & Drop"));

    assert!(workspace.undo(window).unwrap());
    assert_eq!(names_under(&workspace, table, None), ["TraitA", "TraitB"]);
    assert_eq!(names_under(&workspace, table, Some("TraitB")), ["Mod1"]);
}

#[test]
fn test_container_cannot_drop_into_itself() {
    let (mut workspace, window, table, keys) = sheet_workspace();
    view_mut(&mut workspace, table).select_keys(&[keys.trait_b]);
    let payload = workspace.start_drag(table).unwrap();

    let err = workspace
        .drop_rows(table, &payload, Some(DropTarget::into_container(keys.trait_b)))
        .unwrap_err();
    assert!(matches!(
        err,
        OutlineError::DropRejected(DropRejection::IntoOwnSubtree)
    ));
    assert!(workspace.undo_manager(window).unwrap().is_empty());
    assert_eq!(names_under(&workspace, table, None), ["TraitA", "TraitB"]);
}

#[test]
fn test_drop_onto_leaf_is_invalid_target() {
    let (mut workspace, _window, table, keys) = sheet_workspace();
    view_mut(&mut workspace, table).select_keys(&[keys.mod_1]);
    let payload = workspace.start_drag(table).unwrap();

    let err = workspace
        .drop_rows(table, &payload, Some(DropTarget::into_container(keys.trait_a)))
        .unwrap_err();
    assert!(matches!(
        err,
        OutlineError::DropRejected(DropRejection::InvalidTarget)
    ));
}

#[test]
fn test_filtered_destination_rejects_drop() {
    let (mut workspace, _window, table, keys) = sheet_workspace();
    view_mut(&mut workspace, table).select_keys(&[keys.trait_a]);
    let payload = workspace.start_drag(table).unwrap();
    view_mut(&mut workspace, table).filter_by("trait", Vec::new());

    let err = workspace.drop_rows(table, &payload, None).unwrap_err();
    assert!(matches!(
        err,
        OutlineError::DropRejected(DropRejection::Filtered)
    ));
}

#[test]
fn test_copy_between_documents_assigns_new_ids() {
    let (mut workspace, window, sheet_table, keys) = sheet_workspace();
    let library = workspace.add_document(window, "Library").unwrap();
    let other = workspace
        .add_table(window, Some(library), entry_provider(RecordTree::new()))
        .unwrap();

    view_mut(&mut workspace, sheet_table).select_keys(&[keys.trait_b]);
    let payload = workspace.start_drag(sheet_table).unwrap();
    let outcome = workspace.drop_rows(other, &payload, None).unwrap();

    assert!(!outcome.moved);
    assert_eq!(names_under(&workspace, other, None), ["TraitB"]);
    assert_eq!(names_under(&workspace, other, Some("TraitB")), ["Mod1"]);
    assert_ne!(
        entry_named(&workspace, other, "Mod1").id,
        entry_named(&workspace, sheet_table, "Mod1").id
    );
    assert_eq!(names_under(&workspace, sheet_table, None), ["TraitA", "TraitB"]);

    let copied = view(&workspace, other);
    assert!(copied.selection().is_selected(&outcome.inserted[0]));

    workspace.undo(window).unwrap();
    assert!(view(&workspace, other).records().is_empty());
}

#[test]
fn test_drag_payload_survives_source_edits() {
    let (mut workspace, _window, table, keys) = sheet_workspace();
    view_mut(&mut workspace, table).select_keys(&[keys.trait_a]);
    let payload = workspace.start_drag(table).unwrap();

    workspace.delete_selection(table).unwrap();
    let err = workspace
        .drop_rows(table, &payload, Some(DropTarget::root(0)))
        .unwrap_err();
    assert!(matches!(
        err,
        OutlineError::DropRejected(DropRejection::SourceGone)
    ));
    assert_eq!(payload.preview(), "TraitA");
}

#[test]
fn test_move_between_tables_of_one_document_is_one_undo() {
    init_tracing();
    let mut workspace = Workspace::default();
    let window = workspace.add_window("Character Sheet", true);
    let document = workspace.add_document(window, "Sheet").unwrap();
    let (tree, keys) = sheet();
    let traits = workspace
        .add_table(window, Some(document), entry_provider(tree))
        .unwrap();
    let equipment = workspace
        .add_table(window, Some(document), entry_provider(RecordTree::new()))
        .unwrap();

    view_mut(&mut workspace, traits).select_keys(&[keys.trait_b]);
    let payload = workspace.start_drag(traits).unwrap();
    let moved_id = entry_named(&workspace, traits, "TraitB").id.clone();
    let outcome = workspace.drop_rows(equipment, &payload, None).unwrap();

    assert!(outcome.moved);
    assert_eq!(outcome.inserted, [moved_id.clone()]);
    assert_eq!(names_under(&workspace, traits, None), ["TraitA"]);
    assert_eq!(view(&workspace, traits).records().len(), 1);
    assert_eq!(names_under(&workspace, equipment, None), ["TraitB"]);
    assert_eq!(names_under(&workspace, equipment, Some("TraitB")), ["Mod1"]);
    assert_eq!(entry_named(&workspace, equipment, "TraitB").id, moved_id);

    let undo = workspace.undo_manager(window).unwrap();
    assert_eq!(undo.len(), 1);
    assert_eq!(undo.next_undo().unwrap().entries().len(), 2);

    assert!(workspace.undo(window).unwrap());
    assert_eq!(names_under(&workspace, traits, None), ["TraitA", "TraitB"]);
    assert_eq!(names_under(&workspace, traits, Some("TraitB")), ["Mod1"]);
    assert!(view(&workspace, equipment).records().is_empty());

    assert!(workspace.redo(window).unwrap());
    assert_eq!(names_under(&workspace, traits, None), ["TraitA"]);
    assert_eq!(names_under(&workspace, equipment, None), ["TraitB"]);
}

#[test]
fn test_alt_drop_attaches_to_host_row() {
    let (mut workspace, window, table, keys) = sheet_workspace();
    let library = workspace
        .add_table(window, None, modifier_library(&["Extended", "Floating"]))
        .unwrap();
    let all = view(&workspace, library).records().roots().to_vec();
    view_mut(&mut workspace, library).select_keys(&all);
    let payload = workspace.start_drag(library).unwrap();
    assert_eq!(payload.identity(), "modifier");

    assert!(workspace.alt_drop(table, &payload, keys.trait_a).unwrap());
    assert_eq!(
        entry_named(&workspace, table, "TraitA").attached,
        ["Extended", "Floating"]
    );
    assert_eq!(names_under(&workspace, table, None), ["TraitA", "TraitB"]);
    assert_eq!(view(&workspace, table).records().len(), 3);
    assert_eq!(names_under(&workspace, library, None), ["Extended", "Floating"]);

    let undo = workspace.undo_manager(window).unwrap();
    assert_eq!(undo.undo_name(), Some("Row Drag & Drop"));
    let entries = undo.next_undo().unwrap().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].before.table, table);

    workspace.undo(window).unwrap();
    assert!(entry_named(&workspace, table, "TraitA").attached.is_empty());
}

#[test]
fn test_alt_drop_rejects_other_identity() {
    let (mut workspace, window, table, keys) = sheet_workspace();
    view_mut(&mut workspace, table).select_keys(&[keys.mod_1]);
    let payload = workspace.start_drag(table).unwrap();

    let err = workspace
        .alt_drop(table, &payload, keys.trait_a)
        .unwrap_err();
    assert!(matches!(
        err,
        OutlineError::DropRejected(DropRejection::IdentityMismatch)
    ));
    assert!(entry_named(&workspace, table, "TraitA").attached.is_empty());
    assert!(workspace.undo_manager(window).unwrap().is_empty());
}
