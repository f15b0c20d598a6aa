//! Horizon Table - declarative data binding for list and table widgets.
//!
//! Describe a table as [`Section`]s of [`Row`]s, attach model objects, and
//! declare [`Binding`]s between model keypaths and cell keypaths. A
//! [`DataController`] then drives any [`TableWidget`]:
//!
//! - it answers the widget's data-source questions (counts, cells, heights),
//! - keeps every displayed cell in sync with its model, and writes user edits
//!   back when a binding asks for it,
//! - turns row, section and backing-list changes into minimal, batched
//!   update passes.
//!
//! # Example
//!
//! ```
//! use horizon_table::{
//!     BindingOptions, DataController, HeadlessTable, IndexPath, Row, Section, TableConfig,
//! };
//! use horizon_table_core::{ObjectRef, ObservableList, Record};
//!
//! let table = HeadlessTable::shared();
//! let controller = DataController::new(table.clone(), TableConfig::default());
//!
//! let people = ObservableList::shared(vec![
//!     Record::shared().with_value("name", "Ada") as ObjectRef,
//!     Record::shared().with_value("name", "Grace") as ObjectRef,
//! ]);
//! let person_row = Row::standard().into_shared();
//! person_row
//!     .bind_data_object_key_path("name", "text_label.text", BindingOptions::new())
//!     .unwrap();
//! controller.add_section(
//!     Section::new(0)
//!         .with_header_title("People")
//!         .with_dynamic_rows(person_row, people.clone())
//!         .into_shared(),
//! );
//!
//! controller.reload_data();
//! table.render(&controller);
//! assert_eq!(table.visible_cell(IndexPath::new(0, 1)).unwrap().text(), Some("Grace".into()));
//!
//! // Removing an object deletes exactly its row.
//! people.remove(0);
//! let pass = table.update_passes().pop().unwrap();
//! assert_eq!(pass.deleted_rows, vec![IndexPath::new(0, 0)]);
//! ```
//!
//! # Logging
//!
//! Every subsystem logs through `tracing` under the targets in
//! [`horizon_table_core::logging::targets`].

pub mod binding;
pub mod config;
pub mod controller;
pub mod debug;
pub mod delegate;
pub mod error;
pub mod format;
mod layout;
pub mod options;
pub mod row;
pub mod section;
pub mod view;
pub mod widget;

pub use binding::{Binding, BindingSource, BindingTarget};
pub use config::{AutoTextMetrics, TableConfig, DEFAULT_TEXT_FIELD_TAG};
pub use controller::DataController;
pub use delegate::{DelegateCapabilities, TableDelegate};
pub use error::{BindingError, ConfigError, Result};
pub use format::{
    register_transformer, transformer_named, DateFormatter, FnTransformer, Formatter, NegateBoolean,
    NumberFormatter, ValueTransformer,
};
pub use options::{BindingOption, BindingOptions, OptionValue};
pub use row::{EditingStyle, ObjectMode, Row, RowId, VisibilityMode};
pub use section::Section;
pub use view::{AccessoryType, Cell, CellClass, CellId, View};
pub use widget::{HeadlessTable, IndexPath, RowAnimation, TableUpdate, TableWidget};

static_assertions::assert_impl_all!(DataController: Send, Sync);
static_assertions::assert_impl_all!(Row: Send, Sync);
static_assertions::assert_impl_all!(Section: Send, Sync);
static_assertions::assert_impl_all!(Binding: Send, Sync);
