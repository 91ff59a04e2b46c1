//! Stock widgets
//!
//! Each widget is a behavior table built on [`Behaviors::BASE`] plus a typed
//! data record stored on its element. Constructors return the new element's
//! id, unattached; add it to an attached parent to realize it.
//!
//! [`Behaviors::BASE`]: crate::element::Behaviors::BASE

pub mod button;
pub mod label;
pub mod panel;

pub use button::ButtonData;
pub use label::LabelData;
