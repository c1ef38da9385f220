use super::{AddrStatus, ChainBackend, Error};
use crate::config::BitcoindConfig;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

const METHOD_GET_BLOCK_COUNT: &str = "getblockcount";
const METHOD_GET_NEW_ADDRESS: &str = "getnewaddress";
const METHOD_IMPORT_ADDRESS: &str = "importaddress";
const METHOD_LIST_RECEIVED_BY_ADDRESS: &str = "listreceivedbyaddress";

const BECH32: &str = "bech32";

/// JSON-RPC 1.0 client for bitcoind's wallet interface.
pub struct Bitcoind {
    client: reqwest::Client,
    url: Url,
    user: String,
    pass: String,
}

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    result: Value,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl Bitcoind {
    /// Builds the client and verifies the node is actually reachable.
    pub async fn connect(conf: &BitcoindConfig) -> anyhow::Result<Self> {
        let url = Url::parse(&format!("http://{}:{}", conf.host, conf.port))
            .context("invalid bitcoind address")?;
        let client = Self {
            client: reqwest::Client::new(),
            url,
            user: conf.user.clone(),
            pass: conf.pass.clone(),
        };
        client
            .block_count()
            .await
            .context("can't connect to bitcoind")?;
        Ok(client)
    }

    async fn send_request(&self, method: &str, params: Vec<Value>) -> Result<Value, Error> {
        let resp: ResponseBody = self
            .client
            .post(self.url.clone())
            .basic_auth(&self.user, Some(&self.pass))
            .json(&RequestBody {
                jsonrpc: "1.0",
                id: "invoicer",
                method,
                params,
            })
            .send()
            .await?
            .json()
            .await?;
        match resp.error {
            Some(e) => Err(Error::Rpc {
                code: e.code,
                message: e.message,
            }),
            None => Ok(resp.result),
        }
    }
}

#[async_trait]
impl ChainBackend for Bitcoind {
    async fn block_count(&self) -> Result<i64, Error> {
        let result = self.send_request(METHOD_GET_BLOCK_COUNT, Vec::new()).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn new_address(&self, bech32: bool) -> Result<String, Error> {
        let params = if bech32 {
            vec![json!(""), json!(BECH32)]
        } else {
            Vec::new()
        };
        let result = self.send_request(METHOD_GET_NEW_ADDRESS, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn import_address(&self, address: &str, label: &str) -> Result<(), Error> {
        // rescan=false: freshly issued addresses have no history to scan for.
        self.send_request(
            METHOD_IMPORT_ADDRESS,
            vec![json!(address), json!(label), json!(false)],
        )
        .await?;
        Ok(())
    }

    async fn check_address(&self, address: &str) -> Result<Vec<AddrStatus>, Error> {
        // minconf=0, include_empty=true, include_watchonly=true
        let mut params = vec![json!(0), json!(true), json!(true)];
        if !address.is_empty() {
            params.push(json!(address));
        }
        let result = self
            .send_request(METHOD_LIST_RECEIVED_BY_ADDRESS, params)
            .await?;
        let list = serde_json::from_value(result)?;
        Ok(normalize(address, list))
    }
}

/// bitcoind omits addresses it doesn't know about; callers asking for a
/// specific address always get exactly one entry back.
fn normalize(address: &str, list: Vec<AddrStatus>) -> Vec<AddrStatus> {
    if address.is_empty() || !list.is_empty() {
        return list;
    }
    vec![AddrStatus {
        address: address.to_owned(),
        ..AddrStatus::default()
    }]
}
