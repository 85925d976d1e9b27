use crate::domain::model::{Coordinates, HospitalSearch, ImageInput};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 取得裝置約略座標；任何網路錯誤都轉成 `AidError::LocationUnavailable`
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self) -> Result<Coordinates>;
}

/// 以座標搜尋附近醫院；上游失敗以 `HospitalSearch::Unavailable` 表示，不回傳錯誤
#[async_trait]
pub trait HospitalFinder: Send + Sync {
    async fn find_hospitals(&self, coordinates: &Coordinates, radius_meters: u32)
        -> HospitalSearch;
}

/// 回傳模型原始回覆；是否屬於封閉標籤集合由呼叫端以 `Classification::parse` 驗證
#[async_trait]
pub trait WoundClassifier: Send + Sync {
    async fn classify(&self, image: &ImageInput) -> Result<String>;
}

/// prompt + context -> text，各供應商的回應格式由 adapter 自行正規化
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String>;
}
