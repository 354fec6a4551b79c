use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::FetchedArticle;

#[derive(Serialize, Debug)]
pub struct FetchBatchReq<'a> {
    pub source: &'a str,
    pub links: &'a [String],
}

/// Response body: fetched articles keyed by the requested link.
#[derive(Deserialize, Debug)]
#[serde(transparent)]
pub struct FetchBatchResp {
    pub articles: HashMap<String, FetchedArticle>,
}
