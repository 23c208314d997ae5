// Copyright 2024 The hass-mqtt-discovery Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;

use crate::model::AnnounceResponse;

#[derive(Debug, Error)]
pub enum Error {
    /// Entity config could not be encoded as json.
    #[error("failed to serialize payload, err:{0}")]
    Serialize(#[from] serde_json::Error),
    /// Error from the mqtt transport.
    ///
    /// The request reached the client but the broker side failed or the
    /// request queue is closed.
    #[error("mqtt error:{0}")]
    Mqtt(String),
    /// Broker is unreachable and the connection attempt timed out.
    #[error("connect error:{0}")]
    Connect(String),
    /// Topic is not usable for the requested operation.
    #[error("invalid topic:{0}")]
    InvalidTopic(String),
    /// Entity config is rejected before anything is published.
    #[error("invalid entity:{0}")]
    InvalidEntity(String),
    /// Incoming command payload can't be understood by the target entity.
    #[error("invalid payload:{0}")]
    InvalidPayload(String),
    /// Error from the client and basically nothing has been sent yet.
    #[error("client error:{0}")]
    Client(String),
    /// Some entities of a batch announcement failed.
    #[error("announce failed for {} entities", .0.errors.len())]
    AnnounceError(AnnounceError),
    #[error("unknown error:{0}")]
    Unknown(String),
}

#[derive(Debug)]
pub struct AnnounceError {
    pub ok: (Vec<String>, AnnounceResponse), // (object ids, merged response)
    pub errors: Vec<(String, Error)>,        // [(object id, error)]
}

impl From<Vec<(String, Result<AnnounceResponse>)>> for AnnounceError {
    fn from(announce_results: Vec<(String, Result<AnnounceResponse>)>) -> Self {
        let mut published = 0;
        let mut unchanged = 0;
        let mut ok_ids = Vec::new();
        let mut errors = Vec::new();
        for (object_id, result) in announce_results {
            match result {
                Ok(resp) => {
                    published += resp.published;
                    unchanged += resp.unchanged;
                    ok_ids.push(object_id);
                }
                Err(e) => {
                    errors.push((object_id, e));
                }
            }
        }

        Self {
            ok: (ok_ids, AnnounceResponse::new(published, unchanged)),
            errors,
        }
    }
}

impl AnnounceError {
    pub fn all_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<rumqttc::ClientError> for Error {
    fn from(client_err: rumqttc::ClientError) -> Self {
        Error::Mqtt(client_err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_announce_results() {
        let results = vec![
            ("a".to_string(), Ok(AnnounceResponse::new(1, 0))),
            (
                "b".to_string(),
                Err(Error::InvalidEntity("empty command topic".to_string())),
            ),
            ("c".to_string(), Ok(AnnounceResponse::new(0, 1))),
        ];

        let merged: AnnounceError = results.into();
        assert!(!merged.all_ok());
        assert_eq!(merged.ok.0, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(merged.ok.1, AnnounceResponse::new(1, 1));
        assert_eq!(merged.errors.len(), 1);
        assert_eq!(merged.errors[0].0, "b");
        assert_eq!(
            Error::AnnounceError(merged).to_string(),
            "announce failed for 1 entities"
        );
    }
}
