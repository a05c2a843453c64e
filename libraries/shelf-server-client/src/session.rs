//! Playback session endpoints.

use crate::error::{Result, ServerClientError};
use reqwest::{Client, Response, StatusCode};
use shelf_core::{
    EpisodeId, LibraryItemId, PlaybackSession, SessionId, StartSessionRequest, SyncPayload,
};
use tracing::debug;

/// Session client for the media server.
pub struct SessionClient<'a> {
    http: &'a Client,
    base_url: &'a str,
    access_token: &'a str,
}

impl<'a> SessionClient<'a> {
    pub(crate) fn new(http: &'a Client, base_url: &'a str, access_token: &'a str) -> Self {
        Self {
            http,
            base_url,
            access_token,
        }
    }

    /// Open a playback session.
    ///
    /// Podcasts address a single episode with `POST /api/items/{id}/play/{episodeId}`.
    pub async fn start(
        &self,
        library_item_id: &LibraryItemId,
        episode_id: Option<&EpisodeId>,
        request: &StartSessionRequest,
    ) -> Result<PlaybackSession> {
        let url = match episode_id {
            Some(episode_id) => format!(
                "{}/api/items/{}/play/{}",
                self.base_url, library_item_id, episode_id
            ),
            None => format!("{}/api/items/{}/play", self.base_url, library_item_id),
        };
        debug!(url = %url, "Starting playback session");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token)
            .json(request)
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        let entity_id = match episode_id {
            Some(episode_id) => format!("{}/{}", library_item_id, episode_id),
            None => library_item_id.to_string(),
        };
        let response = check_status(response, "Library item", &entity_id).await?;

        let session: PlaybackSession = response.json().await.map_err(|e| {
            ServerClientError::ParseError(format!("Failed to parse playback session: {}", e))
        })?;

        debug!(
            session_id = %session.id,
            play_method = ?session.play_method,
            tracks = session.audio_tracks.len(),
            "Playback session opened"
        );

        Ok(session)
    }

    /// Push progress for an open session.
    pub async fn sync(&self, session_id: &SessionId, payload: &SyncPayload) -> Result<()> {
        let url = format!("{}/api/session/{}/sync", self.base_url, session_id);
        debug!(
            url = %url,
            current_time = payload.current_time,
            time_listened = payload.time_listened,
            "Syncing session progress"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        check_status(response, "Session", session_id.as_str()).await?;
        Ok(())
    }

    /// Close a session.
    ///
    /// Without a payload the request carries an empty body.
    pub async fn close(&self, session_id: &SessionId, payload: Option<&SyncPayload>) -> Result<()> {
        let url = format!("{}/api/session/{}/close", self.base_url, session_id);
        debug!(url = %url, with_progress = payload.is_some(), "Closing session");

        let mut request = self.http.post(&url).bearer_auth(self.access_token);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        check_status(response, "Session", session_id.as_str()).await?;
        Ok(())
    }
}

async fn check_status(response: Response, entity: &str, id: &str) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else if status == StatusCode::UNAUTHORIZED {
        Err(ServerClientError::AuthRequired)
    } else if status == StatusCode::NOT_FOUND {
        Err(ServerClientError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        })
    } else {
        let error_text = response.text().await.unwrap_or_default();
        Err(ServerClientError::ServerError {
            status: status.as_u16(),
            message: error_text,
        })
    }
}
