use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::board::models::{
    Board, BoardDeleted, Card, CardDeleted, CardEnvelope, CardPatch, Column, ErrorBody, NewCard,
};
use crate::errors::SyncError;

/// The board service as seen from the client.
/// Real implementation: `HttpBoardApi`. Test double: `MockBoardApi`.
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn create_board(&self, board: &Board) -> Result<Board, SyncError>;

    async fn list_boards(&self) -> Result<Vec<Board>, SyncError>;

    async fn get_board(&self, id: &str) -> Result<Board, SyncError>;

    async fn rename_board(&self, id: &str, board_name: &str) -> Result<Board, SyncError>;

    async fn delete_board(&self, id: &str) -> Result<(), SyncError>;

    async fn add_card(&self, board_id: &str, card: &NewCard) -> Result<Card, SyncError>;

    async fn update_card(
        &self,
        board_id: &str,
        card_id: &str,
        patch: &CardPatch,
    ) -> Result<Card, SyncError>;

    async fn delete_card(&self, board_id: &str, card_id: &str) -> Result<(), SyncError>;

    async fn move_card(
        &self,
        board_id: &str,
        card_id: &str,
        dest_column: Column,
    ) -> Result<Card, SyncError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenameBody<'a> {
    board_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveBody {
    dest_column: Column,
}

/// `BoardApi` over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpBoardApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBoardApi {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, SyncError> {
        let url = Url::parse(base_url).map_err(|_| SyncError::InvalidUrl(base_url.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url: url,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T, SyncError> {
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

/// Best human-readable message from an error response body.
fn error_message(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        return match parsed.details {
            Some(details) => format!("{}: {}", parsed.error, details),
            None => parsed.error,
        };
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "Server error".to_string()
    } else {
        text
    }
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn create_board(&self, board: &Board) -> Result<Board, SyncError> {
        let url = self.url(&["boards"])?;
        self.send(self.client.post(url).json(board)).await
    }

    async fn list_boards(&self) -> Result<Vec<Board>, SyncError> {
        let url = self.url(&["boards"])?;
        self.send(self.client.get(url)).await
    }

    async fn get_board(&self, id: &str) -> Result<Board, SyncError> {
        let url = self.url(&["boards", id])?;
        self.send(self.client.get(url)).await
    }

    async fn rename_board(&self, id: &str, board_name: &str) -> Result<Board, SyncError> {
        let url = self.url(&["boards", id])?;
        self.send(self.client.put(url).json(&RenameBody { board_name }))
            .await
    }

    async fn delete_board(&self, id: &str) -> Result<(), SyncError> {
        let url = self.url(&["boards", id])?;
        let _: BoardDeleted = self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn add_card(&self, board_id: &str, card: &NewCard) -> Result<Card, SyncError> {
        let url = self.url(&["boards", board_id, "cards"])?;
        self.send(self.client.post(url).json(card)).await
    }

    async fn update_card(
        &self,
        board_id: &str,
        card_id: &str,
        patch: &CardPatch,
    ) -> Result<Card, SyncError> {
        let url = self.url(&["boards", board_id, "cards", card_id])?;
        let envelope: CardEnvelope = self.send(self.client.put(url).json(patch)).await?;
        Ok(envelope.card)
    }

    async fn delete_card(&self, board_id: &str, card_id: &str) -> Result<(), SyncError> {
        let url = self.url(&["boards", board_id, "cards", card_id])?;
        let _: CardDeleted = self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn move_card(
        &self,
        board_id: &str,
        card_id: &str,
        dest_column: Column,
    ) -> Result<Card, SyncError> {
        let url = self.url(&["boards", board_id, "cards", card_id, "move"])?;
        let envelope: CardEnvelope = self
            .send(self.client.put(url).json(&MoveBody { dest_column }))
            .await?;
        Ok(envelope.card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_and_encodes_segments() {
        let api = HttpBoardApi::new("http://localhost:4000").unwrap();
        let url = api.url(&["boards", "my board", "cards"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/boards/my%20board/cards");
    }

    #[test]
    fn test_url_with_trailing_slash_and_prefix() {
        let api = HttpBoardApi::new("http://example.com/api/").unwrap();
        let url = api.url(&["boards", "b1"]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/api/boards/b1");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            HttpBoardApi::new("not a url"),
            Err(SyncError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpBoardApi::new("mailto:someone@example.com"),
            Err(SyncError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_error_message_prefers_json_body() {
        let body = br#"{"error":"Duplicate key error","details":"Board b1 already exists"}"#;
        assert_eq!(
            error_message(body),
            "Duplicate key error: Board b1 already exists"
        );
        assert_eq!(error_message(br#"{"error":"Board not found"}"#), "Board not found");
    }

    #[test]
    fn test_error_message_falls_back_to_text() {
        assert_eq!(error_message(b"Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(b""), "Server error");
    }

    #[test]
    fn test_move_body_uses_client_keys() {
        let json = serde_json::to_value(MoveBody {
            dest_column: Column::Done,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"destColumn": "doneCards"}));
    }
}
