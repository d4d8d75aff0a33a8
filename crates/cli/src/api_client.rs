use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("failed to build API URL")
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("API error ({}): {}", status, body);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, req: reqwest::RequestBuilder) -> Result<()> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("API error ({}): {}", status, body);
        }
        Ok(())
    }

    pub async fn register_peer(&self, req: &RegisterPeerRequest) -> Result<PeerResponse> {
        let url = self.url("/v1/peers")?;
        self.send_json(self.http.post(url).json(req)).await
    }

    pub async fn unregister_peer(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("/v1/peers/{name}"))?;
        self.send_empty(self.http.delete(url)).await
    }

    pub async fn list_peers(&self) -> Result<Vec<PeerResponse>> {
        let url = self.url("/v1/peers")?;
        let response: PeerListResponse = self.send_json(self.http.get(url)).await?;
        Ok(response.peers)
    }

    pub async fn list_online_peers(&self, exclude: Option<&str>) -> Result<Vec<PeerResponse>> {
        let mut url = self.url("/v1/peers/online")?;
        if let Some(exclude) = exclude {
            url.query_pairs_mut().append_pair("exclude", exclude);
        }
        let response: PeerListResponse = self.send_json(self.http.get(url)).await?;
        Ok(response.peers)
    }

    pub async fn get_peer(&self, name: &str) -> Result<PeerResponse> {
        let url = self.url(&format!("/v1/peers/{name}"))?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn send_file(&self, req: &SendFileRequest) -> Result<SendFileResponse> {
        let url = self.url("/v1/transfers")?;
        self.send_json(self.http.post(url).json(req)).await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<FileResponse> {
        let url = self.url(&format!("/v1/files/{file_id}"))?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn list_sent_files(&self, name: &str) -> Result<Vec<FileResponse>> {
        let mut url = self.url(&format!("/v1/peers/{name}/files"))?;
        url.query_pairs_mut().append_pair("direction", "sent");
        let response: FileListResponse<FileResponse> = self.send_json(self.http.get(url)).await?;
        Ok(response.files)
    }

    pub async fn list_received_files(&self, name: &str) -> Result<Vec<ReceivedFileResponse>> {
        let mut url = self.url(&format!("/v1/peers/{name}/files"))?;
        url.query_pairs_mut().append_pair("direction", "received");
        let response: FileListResponse<ReceivedFileResponse> =
            self.send_json(self.http.get(url)).await?;
        Ok(response.files)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.url("/v1/health")?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        let url = self.url("/v1/status")?;
        self.send_json(self.http.get(url)).await
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterPeerRequest {
    pub name: String,
    pub address: String,
    pub port: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerResponse {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub status: String,
    pub last_seen: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct PeerListResponse {
    pub peers: Vec<PeerResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SendFileRequest {
    pub filename: String,
    pub filesize: u64,
    pub checksum: String,
    pub owner: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FailedDelivery {
    pub recipient: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SendFileResponse {
    pub file_id: String,
    pub permission: String,
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
    pub full_success: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryResponse {
    pub recipient: String,
    pub status: String,
    pub reason: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileResponse {
    pub file_id: String,
    pub filename: String,
    pub filesize: u64,
    pub checksum: String,
    pub owner: String,
    pub permission: String,
    pub state: String,
    pub created_at: String,
    pub deliveries: Vec<DeliveryResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ReceivedFileResponse {
    pub file_id: String,
    pub filename: String,
    pub filesize: u64,
    pub checksum: String,
    pub owner: String,
    pub permission: String,
    pub created_at: String,
    pub status: String,
    pub reason: Option<String>,
    pub completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileListResponse<T> {
    pub files: Vec<T>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub peers_total: u64,
    pub peers_online: u64,
}
