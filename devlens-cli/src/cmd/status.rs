use devlens::Generator;
use serde::Serialize;

use crate::output::{print_json, print_table};

#[derive(Debug, Serialize)]
struct Status {
    backend: String,
    model: String,
    configured: bool,
    reachable: bool,
    strategy: &'static str,
}

async fn status(generator: &Generator) -> Status {
    let backend = generator.backend();
    let configured = backend.is_configured();
    Status {
        backend: backend.name().to_string(),
        model: backend.model().to_string(),
        configured,
        reachable: configured && backend.is_available().await,
        strategy: if generator.strategy().repairs() {
            "retrying"
        } else {
            "single-shot"
        },
    }
}

pub async fn run(generator: &Generator, json: bool) -> anyhow::Result<()> {
    let status = status(generator).await;
    if json {
        return print_json(&status);
    }

    let yes_no = |b: bool| if b { "yes" } else { "no" }.to_string();
    print_table(
        &["BACKEND", "MODEL", "CONFIGURED", "REACHABLE", "STRATEGY"],
        &[vec![
            status.backend,
            status.model,
            yes_no(status.configured),
            yes_no(status.reachable),
            status.strategy.to_string(),
        ]],
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlens::{MockBackend, StrategyHint};

    #[tokio::test]
    async fn test_status_of_mock() {
        let generator =
            Generator::new(MockBackend::new().with_strategy(StrategyHint::SingleShot));
        let status = status(&generator).await;
        assert_eq!(status.backend, "Mock");
        assert_eq!(status.model, "mock-model");
        assert!(status.configured);
        assert!(status.reachable);
        assert_eq!(status.strategy, "single-shot");
    }

    #[tokio::test]
    async fn test_unconfigured_backend_is_not_probed() {
        let generator = Generator::new(MockBackend::new().unconfigured());
        let status = status(&generator).await;
        assert!(!status.configured);
        assert!(!status.reachable);
        assert_eq!(status.strategy, "retrying");
    }
}
