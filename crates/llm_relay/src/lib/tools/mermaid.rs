use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{prompt::PromptSet, text::strip_code_fence, ChatModel};

const SYSTEM_PROMPT: &str = "You are a mermaid.js diagram generator.  You ONLY respond with valid mermaid.js code blocks.  Do not include any other text.";

#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub code: String,
}

impl Diagram {
    /// A standalone page that renders the diagram with mermaid from jsdelivr.
    pub fn html(&self) -> String {
        format!(
            r#"
<!DOCTYPE html>
<html>
<head>
    <title>Mermaid Diagram</title>
    <script type="module">
        import mermaid from 'https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs';
        mermaid.initialize({{ startOnLoad: true }});
    </script>
</head>
<body>
    <div class="mermaid">
        {}
    </div>
</body>
</html>
"#,
            self.code
        )
    }

    pub fn data_uri(&self) -> String {
        format!("data:text/html;base64,{}", STANDARD.encode(self.html()))
    }
}

pub struct MermaidGenerator<C> {
    chat: C,
    temperature: f32,
}

impl<C: ChatModel> MermaidGenerator<C> {
    pub fn new(chat: C) -> Self {
        Self {
            chat,
            temperature: 0.7,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn generate(&self, prompt: &str) -> anyhow::Result<Diagram> {
        let request = PromptSet::new(SYSTEM_PROMPT)
            .postprompt(prompt)
            .into_request(self.temperature);

        let reply = self
            .chat
            .complete(request)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to generate diagram: {e}"))?;

        Ok(Diagram {
            code: strip_code_fence(&reply),
        })
    }
}
