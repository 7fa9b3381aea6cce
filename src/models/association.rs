use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Id;

/// A span during which an asset was assigned to a client.
///
/// Both dates are inclusive. An absent `exit_date` means the association is
/// still open and not yet billable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationPeriod {
    pub id: Id,
    pub asset_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Id>,
    pub entry_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<NaiveDate>,
}

impl AssociationPeriod {
    pub fn closed(asset_id: Id, entry_date: NaiveDate, exit_date: NaiveDate) -> Self {
        Self {
            id: Id::new(),
            asset_id,
            client_id: None,
            entry_date,
            exit_date: Some(exit_date),
        }
    }

    pub fn open(asset_id: Id, entry_date: NaiveDate) -> Self {
        Self {
            id: Id::new(),
            asset_id,
            client_id: None,
            entry_date,
            exit_date: None,
        }
    }

    pub fn with_client(mut self, client_id: Id) -> Self {
        self.client_id = Some(client_id);
        self
    }
}
