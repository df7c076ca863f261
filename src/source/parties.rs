//! Party resolver: `/deputados/{id}` → `ultimoStatus.siglaPartido`.

use super::DataSource;
use crate::api::Transport;
use crate::models::party_code_from_json;
use crate::pacing::Sleeper;
use tracing::debug;

impl<T: Transport, S: Sleeper> DataSource<T, S> {
    /// Current party code of a legislator, uppercased.
    ///
    /// Empty when the legislator cannot be fetched or has no party on
    /// record. Successful lookups are cached and reused across bills.
    pub async fn party_of(&mut self, legislator_id: u64) -> String {
        if let Some(party) = self.cache.parties.get(&legislator_id) {
            return party;
        }

        let path = format!("/deputados/{}", legislator_id);
        let Some(json) = self.client.fetch(&path, &[]).await else {
            return String::new();
        };

        let party = party_code_from_json(&json);
        debug!("Legislator {}: party '{}'", legislator_id, party);

        self.cache.parties.insert(legislator_id, party.clone());
        party
    }
}
