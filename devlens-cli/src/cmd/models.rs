use anyhow::Context;
use devlens::Generator;

use crate::output::{print_json, print_table};

pub async fn run(generator: &Generator, json: bool) -> anyhow::Result<()> {
    let backend = generator.backend();
    let models = backend
        .list_models()
        .await
        .with_context(|| format!("failed to list {} models", backend.name()))?;

    if json {
        return print_json(&models);
    }

    let rows = models
        .into_iter()
        .map(|name| {
            let marker = if name == backend.model() { "*" } else { "" };
            vec![name, marker.to_string()]
        })
        .collect::<Vec<_>>();
    print_table(&["MODEL", "CURRENT"], &rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlens::{build_backend, BackendConfig, BackendKind, MockBackend};

    #[tokio::test]
    async fn test_unavailable_backend_errors() {
        let backend = build_backend(&BackendConfig::new(BackendKind::None));
        let err = run(&Generator::from_boxed(backend), true)
            .await
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("failed to list LLM backend models"));
        assert!(message.ends_with("LLM backend is not available"));
    }

    #[tokio::test]
    async fn test_lists_models() {
        let generator = Generator::new(
            MockBackend::new().with_models(vec![String::from("mock-model"), String::from("other")]),
        );
        run(&generator, false).await.unwrap();
    }
}
