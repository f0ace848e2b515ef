//! Offer/answer exchange with the signaling endpoint.
//!
//! The rendezvous is a plain HTTP POST: the offer goes up as
//! `{"type":"offer","sdp":...}` and the response body carries the answer
//! in the same shape. The message format is fixed by the remote server.

use serde::{Deserialize, Serialize};

use crate::errors::{NegotiationStage, PoseLinkError, Result};

/// One signaling message, either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

impl SignalingMessage {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "offer".to_string(),
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: "answer".to_string(),
            sdp: sdp.into(),
        }
    }
}

/// HTTP client for the offer/answer rendezvous.
pub struct SignalingClient {
    url: String,
    http: reqwest::Client,
}

impl SignalingClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the local offer and return the remote answer SDP.
    pub async fn exchange_offer(&self, offer_sdp: &str) -> Result<String> {
        log::info!("Sending offer to {}", self.url);

        let response = self
            .http
            .post(&self.url)
            .json(&SignalingMessage::offer(offer_sdp))
            .send()
            .await
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::SignalingExchange, e))?;

        let response = response
            .error_for_status()
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::SignalingExchange, e))?;

        let message: SignalingMessage = response
            .json()
            .await
            .map_err(|e| PoseLinkError::negotiation(NegotiationStage::SignalingExchange, e))?;

        if message.kind != "answer" {
            return Err(PoseLinkError::negotiation(
                NegotiationStage::SignalingExchange,
                format!("expected answer, got \"{}\"", message.kind),
            ));
        }

        log::info!("Received answer from {}", self.url);
        Ok(message.sdp)
    }
}
