//! Integration tests for delegate callbacks and the text, image and date
//! edit flows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use horizon_table::{
    AccessoryType, BindingError, BindingOptions, CellClass, DataController, DelegateCapabilities,
    EditingStyle, HeadlessTable, IndexPath, ObjectMode, Row, Section, TableConfig, TableDelegate, View,
    VisibilityMode,
};
use horizon_table_core::{ControlEvent, KeyValueObject, ObjectRef, ObservableList, Record, Value};

fn setup() -> (Arc<HeadlessTable>, DataController) {
    let table = HeadlessTable::shared();
    let controller = DataController::new(table.clone(), TableConfig::default());
    (table, controller)
}

fn path(section: usize, row: usize) -> IndexPath {
    IndexPath::new(section, row)
}

fn field_cells() -> CellClass {
    CellClass::new("Field").with_factory(|reuse| {
        let cell = horizon_table::Cell::new(reuse);
        cell.root().add_subview(View::shared(9999));
        cell
    })
}

fn date(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap()
}

/// Answers value-source questions from a settings record.
struct Owner {
    settings: Arc<Record>,
}

impl TableDelegate for Owner {
    fn capabilities(&self) -> DelegateCapabilities {
        DelegateCapabilities {
            value_source: true,
            ..DelegateCapabilities::NONE
        }
    }

    fn value_source(&self) -> Option<ObjectRef> {
        Some(self.settings.clone())
    }
}

/// Decides visibility and records taps.
#[derive(Default)]
struct Recorder {
    show_secret: AtomicBool,
    actions: Mutex<Vec<String>>,
}

impl Recorder {
    fn log(&self, what: &str, row: &Row) {
        self.actions.lock().unwrap().push(format!("{what} {}", row.tag()));
    }

    fn taken(&self) -> Vec<String> {
        std::mem::take(&mut *self.actions.lock().unwrap())
    }
}

impl TableDelegate for Recorder {
    fn capabilities(&self) -> DelegateCapabilities {
        DelegateCapabilities {
            object_for_row: false,
            value_source: false,
            ..DelegateCapabilities::ALL
        }
    }

    fn is_row_visible(&self, _row: &Row) -> bool {
        self.show_secret.load(Ordering::SeqCst)
    }

    fn is_dynamic_row_visible(&self, _row: &Row, object: &ObjectRef) -> bool {
        object.value_for_key("archived") != Some(Value::Bool(true))
    }

    fn perform_action(&self, row: &Row) {
        self.log("select", row);
    }

    fn perform_accessory_action(&self, row: &Row) {
        self.log("accessory", row);
    }

    fn commit_insert(&self, row: &Row) {
        self.log("insert", row);
    }

    fn commit_delete(&self, row: &Row) {
        self.log("delete", row);
    }
}

#[test]
fn test_owner_key_path_row_follows_value_source() {
    let (table, controller) = setup();
    let ada: ObjectRef = Record::shared().with_value("name", "Ada");
    let grace: ObjectRef = Record::shared().with_value("name", "Grace");
    let owner = Arc::new(Owner {
        settings: Record::shared().with_value("profile", ada),
    });

    let row = Row::standard().with_object_key_path("profile").into_shared();
    row.bind_data_object_key_path("name", "text_label.text", BindingOptions::new())
        .unwrap();
    controller.add_row(row.clone());
    assert!(!row.is_observing_owner_key_path());

    controller.set_delegate(&owner);
    assert!(row.is_observing_owner_key_path());
    assert_eq!(row.object_mode(), ObjectMode::OwnerKeyPath);
    controller.reload_data();
    table.render(&controller);
    assert_eq!(table.visible_cell(path(0, 0)).unwrap().text(), Some("Ada".into()));

    owner.settings.set("profile", grace);
    assert_eq!(table.update_passes()[0].reloaded_rows, vec![path(0, 0)]);
    table.render(&controller);
    assert_eq!(table.visible_cell(path(0, 0)).unwrap().text(), Some("Grace".into()));

    controller.clear_delegate();
    assert!(!row.is_observing_owner_key_path());
}

#[test]
fn test_labels_bound_to_value_source() {
    let (table, controller) = setup();
    let owner = Arc::new(Owner {
        settings: Record::shared()
            .with_value("title", "Inbox")
            .with_value("unread", "3 new"),
    });
    controller.set_delegate(&owner);
    controller.add_row(
        Row::standard()
            .with_text_bound_to_key_path("title")
            .with_detail_text_bound_to_key_path("unread")
            .into_shared(),
    );
    controller.reload_data();
    table.render(&controller);

    let cell = table.visible_cell(path(0, 0)).unwrap();
    assert_eq!(cell.text(), Some("Inbox".into()));
    assert_eq!(cell.detail_text(), Some("3 new".into()));
    assert_eq!(controller.live_binding_count(), 2);

    owner.settings.set("title", "Archive");
    assert_eq!(cell.text(), Some("Archive".into()));

    table.recycle(&controller, path(0, 0));
    assert_eq!(owner.settings.observer_count(), 0);
}

#[test]
fn test_delegate_decides_row_visibility() {
    let (table, controller) = setup();
    let recorder = Arc::new(Recorder::default());
    let secret = Row::standard()
        .with_tag(2)
        .with_visibility_mode(VisibilityMode::Delegate)
        .into_shared();
    controller.add_row(Row::standard().with_tag(1).into_shared());
    controller.add_row(secret.clone());
    controller.set_delegate(&recorder);
    controller.reload_data();
    assert_eq!(controller.number_of_rows_in_section(0), 1);

    recorder.show_secret.store(true, Ordering::SeqCst);
    secret.refresh();
    assert_eq!(table.update_passes()[0].inserted_rows, vec![path(0, 1)]);

    // Without a delegate the flag decides.
    recorder.show_secret.store(false, Ordering::SeqCst);
    controller.clear_delegate();
    assert!(controller.perform_visibility_check_for_row(&secret));
    assert_eq!(controller.number_of_rows_in_section(0), 2);
}

#[test]
fn test_delegate_filters_dynamic_rows() {
    let (_table, controller) = setup();
    let recorder = Arc::new(Recorder::default());
    let list = ObservableList::shared(vec![
        Record::shared().with_value("name", "A") as ObjectRef,
        Record::shared().with_value("name", "B").with_value("archived", true),
        Record::shared().with_value("name", "C"),
    ]);
    controller.add_section(
        Section::new(0)
            .with_dynamic_rows(Row::standard().into_shared(), list)
            .into_shared(),
    );
    controller.set_delegate(&recorder);
    controller.reload_data();

    assert!(controller.delegate_implements_dynamic_row_visibility());
    assert_eq!(controller.number_of_rows_in_section(0), 2);
    assert_eq!(controller.index_of_dynamic_object_at(path(0, 1)), Some(2));
    let shown = controller.dynamic_object_at(path(0, 1)).unwrap();
    assert_eq!(shown.value_for_key("name"), Some(Value::from("C")));
}

#[test]
fn test_actions_fall_back_to_delegate() {
    let (_table, controller) = setup();
    let recorder = Arc::new(Recorder::default());
    let own = Arc::new(Mutex::new(0));
    let counter = own.clone();
    controller.add_row(
        Row::standard()
            .with_tag(1)
            .with_action(move |_| *counter.lock().unwrap() += 1)
            .into_shared(),
    );
    let plain = Row::standard().with_tag(2).with_delete_action().into_shared();
    controller.add_row(plain.clone());
    controller.add_row(Row::standard().with_tag(3).with_insert_action().into_shared());
    controller.reload_data();

    // No delegate yet: only the row's own action runs.
    assert!(controller.did_select_row_at(path(0, 0)));
    assert!(!controller.did_select_row_at(path(0, 1)));
    assert!(!controller.commit_edit(path(0, 1), EditingStyle::Delete));
    assert_eq!(controller.accessory_for_row(&plain), AccessoryType::None);

    controller.set_delegate(&recorder);
    assert!(controller.did_select_row_at(path(0, 0)));
    assert!(controller.did_select_row_at(path(0, 1)));
    assert!(controller.accessory_button_tapped(path(0, 1)));
    assert_eq!(controller.accessory_for_row(&plain), AccessoryType::DisclosureIndicator);
    assert_eq!(*own.lock().unwrap(), 2);

    assert_eq!(controller.editing_style_for_row_at(path(0, 1)), EditingStyle::Delete);
    assert_eq!(controller.editing_style_for_row_at(path(0, 2)), EditingStyle::Insert);
    assert!(controller.commit_edit(path(0, 1), EditingStyle::Delete));
    assert!(controller.commit_edit(path(0, 2), EditingStyle::Insert));
    assert!(!controller.commit_edit(path(0, 0), EditingStyle::None));
    assert_eq!(
        recorder.taken(),
        vec!["select 2", "accessory 2", "delete 2", "insert 3"]
    );
}

#[test]
fn test_selection_while_editing() {
    let (_table, controller) = setup();
    let recorder = Arc::new(Recorder::default());
    controller.set_delegate(&recorder);
    controller.add_row(Row::standard().with_tag(1).into_shared());
    controller.add_row(Row::standard().with_tag(2).with_select_during_editing().into_shared());
    controller.reload_data();
    controller.set_editing(true);

    assert!(!controller.did_select_row_at(path(0, 0)));
    assert!(controller.did_select_row_at(path(0, 1)));
    assert_eq!(recorder.taken(), vec!["select 2"]);
}

#[test]
fn test_second_text_edit_concludes_the_first() {
    let (table, controller) = setup();
    let ada = Record::shared().with_value("name", "Ada");
    let grace = Record::shared().with_value("name", "Grace");
    for person in [&ada, &grace] {
        let row = Row::new(field_cells()).with_object(person.clone()).into_shared();
        row.bind_data_object_key_path_to_view_with_tag(
            "name",
            9999,
            "text",
            BindingOptions::new().with_editing_events(),
        )
        .unwrap();
        controller.add_row(row);
    }
    controller.reload_data();
    table.render(&controller);

    let first = controller.begin_text_editing(path(0, 0)).unwrap();
    assert_eq!(controller.text_editing_index_path(), Some(path(0, 0)));
    first.user_edit("text", "Ada L", ControlEvent::TextDidChange);
    assert_eq!(ada.get("name"), Some(Value::from("Ada")));

    let second = controller.begin_text_editing(path(0, 1)).unwrap();
    assert_eq!(ada.get("name"), Some(Value::from("Ada L")));
    assert!(Arc::ptr_eq(&controller.editing_text_field().unwrap(), &second));

    second.user_edit("text", "Grace H", ControlEvent::TextDidChange);
    assert!(controller.end_text_editing());
    assert_eq!(grace.get("name"), Some(Value::from("Grace H")));
    assert!(!controller.end_text_editing());
    assert_eq!(controller.text_editing_index_path(), None);
}

#[test]
fn test_text_editing_needs_a_field() {
    let (table, controller) = setup();
    controller.add_row(Row::standard().into_shared());
    controller.add_row(Row::new(field_cells()).with_text_field_tag(7).into_shared());
    controller.reload_data();
    table.render(&controller);

    assert!(controller.begin_text_editing(path(0, 0)).is_none());
    assert!(controller.begin_text_editing(path(0, 1)).is_none());
    assert!(controller.begin_text_editing(path(0, 5)).is_none());
}

#[test]
fn test_apply_image_writes_back() {
    let (table, controller) = setup();
    let contact = Record::shared().with_value("photo", "old.png");
    let row = Row::standard().with_object(contact.clone()).into_shared();
    row.bind_data_object_key_path(
        "photo",
        "image_view.image",
        BindingOptions::new().with_value_changed(),
    )
    .unwrap();
    controller.add_row(row);
    controller.reload_data();
    table.render(&controller);

    assert!(!controller.apply_image("ignored.png"));
    assert!(controller.begin_image_editing(path(0, 0)));
    assert_eq!(controller.image_editing_index_path(), Some(path(0, 0)));

    assert!(controller.apply_image("new.png"));
    assert_eq!(contact.get("photo"), Some(Value::from("new.png")));
    let image_view = table.visible_cell(path(0, 0)).unwrap().image_view().unwrap();
    assert_eq!(image_view.get("image"), Some(Value::from("new.png")));

    assert!(!controller.apply_image("again.png"));
    assert!(!controller.cancel_image_editing());
    assert_eq!(controller.image_editing_index_path(), None);
}

#[test]
fn test_second_image_edit_concludes_the_first() {
    let (table, controller) = setup();
    let ada = Record::shared().with_value("photo", "ada.png");
    let grace = Record::shared().with_value("photo", "grace.png");
    for person in [&ada, &grace] {
        let row = Row::standard().with_object(person.clone()).into_shared();
        row.bind_data_object_key_path(
            "photo",
            "image_view.image",
            BindingOptions::new().with_value_changed(),
        )
        .unwrap();
        controller.add_row(row);
    }
    controller.reload_data();
    table.render(&controller);

    assert!(controller.begin_image_editing(path(0, 0)));
    assert!(controller.begin_image_editing(path(0, 1)));
    assert_eq!(controller.image_editing_index_path(), Some(path(0, 1)));

    assert!(controller.apply_image("new.png"));
    assert_eq!(grace.get("photo"), Some(Value::from("new.png")));
    assert_eq!(ada.get("photo"), Some(Value::from("ada.png")));
    let first_view = table.visible_cell(path(0, 0)).unwrap().image_view().unwrap();
    assert_eq!(first_view.get("image"), Some(Value::from("ada.png")));
    assert!(!controller.apply_image("late.png"));
}

#[test]
fn test_date_edit_redisplays_unobserved_row() {
    let (table, controller) = setup();
    let task = Record::shared().with_value("due", date(1));
    let row = Row::standard().with_object(task.clone()).into_shared();
    controller.add_row(row.clone());
    controller.reload_data();
    table.render(&controller);

    controller.begin_date_editing(path(0, 0), "due").unwrap();
    assert!(Arc::ptr_eq(&controller.row_for_date_editing().unwrap(), &row));

    controller.apply_date(date(15)).unwrap();
    assert_eq!(task.get("due"), Some(Value::Date(date(15))));
    assert_eq!(table.update_passes()[0].reloaded_rows, vec![path(0, 0)]);
    assert_eq!(controller.date_display_text(&Value::Date(date(15))), "15 Mar 2024");

    assert!(controller.end_date_editing());
    assert!(matches!(
        controller.apply_date(date(16)),
        Err(BindingError::NotEditing("date"))
    ));
    assert_eq!(task.get("due"), Some(Value::Date(date(15))));
}

#[test]
fn test_date_edit_on_observed_row_relies_on_binding() {
    let (table, controller) = setup();
    let task = Record::shared().with_value("due", date(1));
    let row = Row::standard().with_object(task.clone()).into_shared();
    row.bind_data_object_key_path("due", "text_label.text", BindingOptions::new())
        .unwrap();
    controller.add_row(row);
    controller.reload_data();
    table.render(&controller);
    let cell = table.visible_cell(path(0, 0)).unwrap();
    assert_eq!(cell.text(), Some("1 Mar 2024".into()));

    controller.begin_date_editing(path(0, 0), "due").unwrap();
    controller.apply_date(date(15)).unwrap();
    assert_eq!(table.update_pass_count(), 0);
    assert_eq!(task.get("due"), Some(Value::Date(date(15))));
    assert_eq!(cell.text(), Some("15 Mar 2024".into()));
}

#[test]
fn test_date_edit_needs_an_object() {
    let (table, controller) = setup();
    controller.add_row(Row::standard().into_shared());
    controller.reload_data();
    table.render(&controller);

    assert!(matches!(
        controller.begin_date_editing(path(0, 0), "due"),
        Err(BindingError::NoRowObject)
    ));
    assert!(matches!(
        controller.begin_date_editing(path(3, 0), "due"),
        Err(BindingError::NoLiveCell)
    ));
    assert!(controller.row_for_date_editing().is_none());
}
