//! Integration tests for structural updates: batching, backing-list deltas,
//! visibility and editing mode.

use std::sync::Arc;

use horizon_table::{
    BindingOptions, CellClass, DataController, HeadlessTable, IndexPath, Row, RowAnimation, Section,
    TableConfig, TableUpdate, View, VisibilityMode,
};
use horizon_table_core::{KeyValueObject, ObjectRef, ObservableList, Record};

fn setup() -> (Arc<HeadlessTable>, DataController) {
    let table = HeadlessTable::shared();
    let controller = DataController::new(table.clone(), TableConfig::default());
    (table, controller)
}

fn person(name: &str) -> ObjectRef {
    Record::shared().with_value("name", name)
}

fn field_cells() -> CellClass {
    CellClass::new("Field").with_factory(|reuse| {
        let cell = horizon_table::Cell::new(reuse);
        cell.root().add_subview(View::shared(9999));
        cell
    })
}

/// A controller showing `objects` in a dynamic section tagged 0.
fn dynamic_table(objects: Vec<ObjectRef>) -> (Arc<HeadlessTable>, DataController, Arc<ObservableList>) {
    let (table, controller) = setup();
    let list = ObservableList::shared(objects);
    let prototype = Row::new(field_cells()).into_shared();
    prototype
        .bind_data_object_key_path("name", "text_label.text", BindingOptions::new())
        .unwrap();
    controller.add_section(
        Section::new(0)
            .with_dynamic_rows(prototype, list.clone())
            .into_shared(),
    );
    controller.reload_data();
    table.render(&controller);
    (table, controller, list)
}

fn path(section: usize, row: usize) -> IndexPath {
    IndexPath::new(section, row)
}

#[test]
fn test_nested_batch_equals_single_batch() {
    let run = |nested: bool| -> Vec<TableUpdate> {
        let objects = vec![person("A"), person("B"), person("C")];
        let (table, controller, list) = dynamic_table(objects);
        controller.begin_updates();
        if nested {
            controller.begin_updates();
        }
        list.remove(1);
        list.push(person("D"));
        controller.add_row_to_section(Row::standard().into_shared(), 0);
        if nested {
            controller.end_updates();
            assert_eq!(table.update_pass_count(), 0);
        }
        controller.end_updates();
        table.update_passes()
    };

    let nested = run(true);
    let single = run(false);
    assert_eq!(nested.len(), 1);
    assert_eq!(nested, single);

    let pass = &nested[0];
    assert_eq!(pass.deleted_rows, vec![path(0, 1)]);
    // Static rows come first, so the new static row lands at the top.
    assert_eq!(pass.inserted_rows, vec![path(0, 0), path(0, 3)]);
    assert!(pass.moved_rows.is_empty());
}

#[test]
fn test_perform_batch_emits_one_pass() {
    let (table, controller, list) = dynamic_table(vec![person("A")]);
    controller.perform_batch(|_| {
        list.push(person("B"));
        list.push(person("C"));
        list.remove(0);
    });
    assert_eq!(table.update_pass_count(), 1);
    let pass = &table.update_passes()[0];
    assert_eq!(pass.deleted_rows, vec![path(0, 0)]);
    assert_eq!(pass.inserted_rows, vec![path(0, 0), path(0, 1)]);
}

#[test]
fn test_removing_object_deletes_exactly_its_row() {
    let a = person("A");
    let c = person("C");
    let (table, controller, list) = dynamic_table(vec![a.clone(), person("B"), c.clone()]);
    let cell_a = table.visible_cell(path(0, 0)).unwrap();
    let cell_c = table.visible_cell(path(0, 2)).unwrap();

    let field = controller.begin_text_editing(path(0, 2)).unwrap();
    assert_eq!(controller.live_cell_count(), 3);

    list.remove(1);
    let passes = table.update_passes();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].deleted_rows, vec![path(0, 1)]);
    assert!(passes[0].inserted_rows.is_empty());
    assert!(passes[0].moved_rows.is_empty());
    assert!(passes[0].reloaded_rows.is_empty());

    // A and C keep their cells, bindings and edit state.
    assert!(Arc::ptr_eq(&table.visible_cell(path(0, 0)).unwrap(), &cell_a));
    assert!(Arc::ptr_eq(&table.visible_cell(path(0, 1)).unwrap(), &cell_c));
    assert_eq!(controller.live_cell_count(), 2);
    assert!(Arc::ptr_eq(&controller.editing_text_field().unwrap(), &field));
    assert_eq!(controller.text_editing_index_path(), Some(path(0, 1)));

    a.set_value_for_key("name", "A2".into()).unwrap();
    assert_eq!(cell_a.text(), Some("A2".into()));
    assert_eq!(controller.index_of_dynamic_object_at(path(0, 1)), Some(1));
}

#[test]
fn test_move_and_insert_deltas() {
    let (table, _controller, list) = dynamic_table(vec![person("A"), person("B"), person("C")]);
    list.move_item(2, 0);
    list.insert(1, person("X"));

    let passes = table.update_passes();
    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0].moved_rows, vec![(path(0, 2), path(0, 0))]);
    assert_eq!(passes[1].inserted_rows, vec![path(0, 1)]);
    assert_eq!(passes[1].animation, RowAnimation::Automatic);
}

#[test]
fn test_reset_diffs_by_identity() {
    let a = person("A");
    let b = person("B");
    let (table, _controller, list) = dynamic_table(vec![a.clone(), b.clone()]);
    list.replace_all(vec![b.clone(), person("N"), a.clone()]);

    let pass = table.update_passes().pop().unwrap();
    assert_eq!(pass.inserted_rows, vec![path(0, 1)]);
    assert_eq!(pass.moved_rows.len(), 1);
    assert!(pass.deleted_rows.is_empty());
}

#[test]
fn test_new_objects_never_take_over_removed_rows() {
    let (table, controller) = setup();
    let list = ObservableList::shared(vec![person("A")]);
    controller.add_section(
        Section::new(0)
            .with_dynamic_rows(Row::standard().into_shared(), list.clone())
            .into_shared(),
    );
    controller.reload_data();

    controller.perform_batch(|_| {
        drop(list.remove(0));
        for n in 0..50 {
            list.push(person(&format!("N{n}")));
        }
    });
    let pass = table.update_passes().pop().unwrap();
    assert_eq!(pass.deleted_rows, vec![path(0, 0)]);
    assert_eq!(pass.inserted_rows.len(), 50);
    assert!(pass.moved_rows.is_empty());
    assert!(pass.reloaded_rows.is_empty());
}

#[test]
fn test_index_path_for_repeated_object() {
    let a = person("A");
    let (_table, controller, _list) = dynamic_table(vec![person("B"), a.clone(), a.clone()]);
    let section = controller.section_tagged(0).unwrap();
    let prototype = section.dynamic_prototype().unwrap();
    prototype.set_object(Some(a.clone()));

    assert_eq!(controller.index_path_for_row(&prototype), Some(path(0, 1)));
    assert_eq!(controller.index_path_for_row_occurrence(&prototype, 1), Some(path(0, 2)));
    assert_eq!(controller.index_path_for_row_occurrence(&prototype, 2), None);
}

#[test]
fn test_same_object_twice_gets_two_rows() {
    let a = person("A");
    let (table, controller, list) = dynamic_table(vec![a.clone(), a.clone()]);
    assert_eq!(controller.number_of_rows_in_section(0), 2);
    list.remove(0);
    let pass = table.update_passes().pop().unwrap();
    assert_eq!(pass.deleted_rows, vec![path(0, 1)]);
}

#[test]
fn test_mutations_before_reload_only_update_the_model() {
    let (table, controller) = setup();
    let list = ObservableList::shared(vec![person("A")]);
    controller.add_section(
        Section::new(0)
            .with_dynamic_rows(Row::standard().into_shared(), list.clone())
            .into_shared(),
    );
    list.push(person("B"));
    controller.add_row(Row::standard().into_shared());
    assert_eq!(table.update_pass_count(), 0);
    assert_eq!(table.reload_count(), 0);

    controller.reload_data();
    assert_eq!(table.reload_count(), 1);
    assert_eq!(controller.number_of_rows_in_section(0), 3);
}

#[test]
fn test_remove_row() {
    let (table, controller) = setup();
    let first = Row::standard().with_tag(1).into_shared();
    let second = Row::standard().with_tag(2).into_shared();
    controller.add_row(first.clone());
    controller.add_row(second.clone());
    controller.reload_data();
    table.render(&controller);

    assert!(controller.remove_row(&first));
    assert!(!controller.remove_row(&first));
    assert!(first.controller().is_none());
    assert_eq!(table.update_passes()[0].deleted_rows, vec![path(0, 0)]);
    assert_eq!(second.table_index_path(), Some(path(0, 0)));
    assert_eq!(controller.live_cell_count(), 1);
}

#[test]
fn test_sections_insert_and_delete() {
    let (table, controller) = setup();
    controller.add_section(Section::new(1).into_shared());
    controller.reload_data();

    controller.perform_batch(|c| {
        c.add_section(Section::new(2).with_footer_title("Footer").into_shared());
        c.remove_section(1);
    });
    let pass = &table.update_passes()[0];
    assert_eq!(pass.deleted_sections, vec![0]);
    assert_eq!(pass.inserted_sections, vec![0]);
    assert_eq!(controller.title_for_footer_in_section(0), Some("Footer".into()));
    assert_eq!(controller.title_for_header_in_section(0), None);
}

#[test]
fn test_editing_only_rows() {
    let (table, controller) = setup();
    let always = Row::standard().with_tag(1).into_shared();
    let editing_only = Row::standard()
        .with_tag(2)
        .with_visibility_mode(VisibilityMode::EditingOnly)
        .into_shared();
    controller.add_row(always.clone());
    controller.add_row(editing_only.clone());
    controller.reload_data();

    assert!(!controller.perform_visibility_check_for_row(&editing_only));
    assert_eq!(controller.number_of_rows_in_section(0), 1);

    controller.set_editing(true);
    assert!(controller.is_editing());
    assert_eq!(table.update_passes()[0].inserted_rows, vec![path(0, 1)]);
    assert_eq!(
        controller.perform_visibility_check_for_row(&editing_only),
        editing_only.is_visible_flag()
    );

    // In editing mode the flag decides, as for a standard row.
    editing_only.set_visible(false);
    editing_only.refresh();
    assert_eq!(table.update_passes()[1].deleted_rows, vec![path(0, 1)]);

    editing_only.set_visible(true);
    editing_only.refresh();
    controller.set_editing(false);
    assert_eq!(table.update_passes()[3].deleted_rows, vec![path(0, 1)]);
    assert_eq!(table.update_pass_count(), 4);
}

#[test]
fn test_refresh_row_tagged() {
    let (table, controller) = setup();
    controller.add_section(Section::new(5).into_shared());
    let row = Row::standard().with_tag(9).with_text("Before").into_shared();
    controller.add_row_to_section(row.clone(), 5);
    controller.reload_data();
    table.render(&controller);

    row.set_text(Some("After".into()));
    assert!(controller.refresh_row_tagged(9, 5));
    assert_eq!(table.update_passes()[0].reloaded_rows, vec![path(0, 0)]);
    table.render(&controller);
    assert_eq!(table.visible_cell(path(0, 0)).unwrap().text(), Some("After".into()));

    assert!(!controller.refresh_row_tagged(9, 6));
    assert!(!controller.refresh_row_tagged(10, 5));
}

#[test]
fn test_hidden_row_refresh_emits_nothing() {
    let (table, controller) = setup();
    let hidden = Row::standard().with_visible(false).into_shared();
    controller.add_row(hidden.clone());
    controller.reload_data();
    hidden.refresh();
    assert_eq!(table.update_pass_count(), 0);

    hidden.set_visible(true);
    hidden.refresh();
    assert_eq!(table.update_passes()[0].inserted_rows, vec![path(0, 0)]);
}

#[test]
#[should_panic(expected = "outside the displayed table")]
fn test_out_of_range_dynamic_index_is_fatal() {
    let (_table, controller, _list) = dynamic_table(vec![person("A")]);
    controller.index_of_dynamic_object_at(path(0, 3));
}
