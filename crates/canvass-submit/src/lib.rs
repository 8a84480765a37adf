//! Visit submission: validation, photo upload to Google Drive, row append
//! to Google Sheets, and the form's option lists.

pub mod error;
pub mod google;
pub mod options;
pub mod row;
pub mod store;
pub mod submitter;
pub mod validate;

pub use error::{StorageError, SubmissionError, ValidationError};
pub use google::{DrivePhotoStore, GoogleClient, OAuthCredentials, SheetsClient, TokenSource};
pub use options::{OptionLists, SAMPLE_SALES, SAMPLE_STATUSES};
pub use row::{maps_url, to_row, VISIT_HEADER};
pub use store::{PhotoStore, PhotoUpload, VisitStore};
pub use submitter::{upload_filename, SubmissionReceipt, Submitter};
pub use validate::validate;
