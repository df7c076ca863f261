//! Author resolver: `/proposicoes/{id}/autores`.

use super::DataSource;
use crate::api::Transport;
use crate::models::AuthorRef;
use crate::pacing::Sleeper;
use tracing::debug;

impl<T: Transport, S: Sleeper> DataSource<T, S> {
    /// Authors of one bill. Empty when the fetch fails.
    ///
    /// The endpoint is read as a single page; successful answers are cached
    /// per bill.
    pub async fn authors_of(&mut self, bill_id: u64) -> Vec<AuthorRef> {
        if let Some(authors) = self.cache.authors.get(&bill_id) {
            return authors;
        }

        let path = format!("/proposicoes/{}/autores", bill_id);
        let Some(json) = self.client.fetch(&path, &[]).await else {
            return Vec::new();
        };

        let authors: Vec<AuthorRef> = json["dados"]
            .as_array()
            .map(|items| items.iter().map(AuthorRef::from_json).collect())
            .unwrap_or_default();
        debug!("Bill {}: {} authors", bill_id, authors.len());

        self.cache.authors.insert(bill_id, authors.clone());
        authors
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::source;
    use crate::testing::FakeApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_authors_of_parses_both_id_locations() {
        let api = FakeApi::new().authors(
            101,
            vec![
                json!({"tipoAutor": "Parlamentar", "idDeputado": 55}),
                json!({"tipoAutor": "Parlamentar", "autor": {"id": 66}}),
                json!({"tipoAutor": "Órgão do Poder Executivo"}),
            ],
        );
        let mut source = source(api.into_transport());

        let authors = source.authors_of(101).await;

        assert_eq!(authors.len(), 3);
        assert_eq!(authors[0].legislator_id(), Some(55));
        assert_eq!(authors[1].legislator_id(), Some(66));
        assert!(!authors[2].is_parliamentary());
        assert_eq!(authors[2].legislator_id(), None);
    }

    #[tokio::test]
    async fn test_authors_of_failure_is_empty_and_not_cached() {
        let api = FakeApi::new().missing("/proposicoes/5/autores");
        let transport = api.into_transport();
        let mut source = source(transport.clone());

        assert!(source.authors_of(5).await.is_empty());
        assert!(source.authors_of(5).await.is_empty());

        assert_eq!(transport.count_matching("/proposicoes/5/autores"), 2);
        assert_eq!(source.client().take_warnings().len(), 2);
    }

    #[tokio::test]
    async fn test_authors_of_cached() {
        let api = FakeApi::new().authors(9, vec![json!({"tipoAutor": "Parlamentar", "idDeputado": 1})]);
        let transport = api.into_transport();
        let mut source = source(transport.clone());

        source.authors_of(9).await;
        let again = source.authors_of(9).await;

        assert_eq!(again.len(), 1);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_authors_of_missing_dados() {
        let transport = crate::testing::ScriptedTransport::new(|_, _| {
            Ok(crate::testing::json_response(json!({"links": []})))
        });
        let mut source = source(transport);

        assert!(source.authors_of(1).await.is_empty());
    }
}
