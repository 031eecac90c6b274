//! Reference data: the codes that budget rows refer to, such as currencies and
//! departments.

mod db;
mod domain;
mod endpoints;
mod snapshot;

pub use db::{create_reference, create_reference_tables, list_references};
pub use domain::{ReferenceCategory, ReferenceCode, ReferenceId, ReferenceRecord};
pub use endpoints::{create_reference_endpoint, list_references_endpoint};
pub use snapshot::{ReferenceData, ReferenceLookup};
