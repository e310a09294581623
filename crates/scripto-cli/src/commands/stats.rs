//! Stats command handler

use anyhow::Result;

use scripto_core::ApiClient;

use crate::output::Output;

/// Show aggregate catalog statistics
pub async fn show(api: &ApiClient, output: &Output) -> Result<()> {
    match api.analytics().await {
        Ok(analytics) => output.print_analytics(&analytics),
        Err(e) => output.banner(&e.message()),
    }
    Ok(())
}
