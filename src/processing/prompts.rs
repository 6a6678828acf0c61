//! Prompt builders for each kind of generation call.

use super::types::{ArtifactKind, Chunk};
use std::path::Path;

const SUMMARY_FORMAT: &str = "形式:
# 章タイトル
- 要点1
- 要点2
- 要点3";

const CRITIQUE_FORMAT: &str = "形式:
# 新規性
- 要点1
- 要点2

# 言及されている全ての関連研究との相違点
- 要点1
- 要点2

# 有効性
- 要点1
- 要点2

# 信頼性
- 要点1
- 要点2";

const CRITIQUE_SLICE_GUIDE: &str = "# 新規性
（この論文の新しい貢献は何か、箇条書きで）

# 言及されている全ての関連研究との相違点
（先行研究と比べて何が違うか、箇条書きで）

# 有効性
（提案手法・分析は有効か、どのような成果があるか、箇条書きで）

# 信頼性
（結果は信頼できるか、データの質・規模・再現性はどうか、箇条書きで）";

fn format_block(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Summary => SUMMARY_FORMAT,
        ArtifactKind::Critique => CRITIQUE_FORMAT,
    }
}

/// Prompt for one chunk of a larger document.
pub(crate) fn chunk_prompt(kind: ArtifactKind, chunk: &Chunk<'_>) -> String {
    let (index, total) = (chunk.index, chunk.total);
    match kind {
        ArtifactKind::Summary => format!(
            "以下の論文テキスト（パート {index}/{total}）を、章・セクションごとに要約してください。
このパートに含まれる内容だけを要約してください。

{SUMMARY_FORMAT}

重要なポイントを箇条書きで簡潔にまとめてください。
余計な説明は不要です。要約のみを出力してください。

---
{text}
---",
            text = chunk.text
        ),
        ArtifactKind::Critique => format!(
            "以下の論文テキスト（パート {index}/{total}）を分析し、以下の4つの観点で情報を抽出してください。
このパートに含まれる内容だけを対象にしてください。
余計な説明は不要です。分析結果のみを出力してください。
このパートに該当する情報がない観点は「該当情報なし」と記載してください。

{CRITIQUE_SLICE_GUIDE}

---
{text}
---",
            text = chunk.text
        ),
    }
}

/// Prompt merging the partials of every chunk into one document.
pub(crate) fn merge_prompt(kind: ArtifactKind, combined: &str) -> String {
    let format = format_block(kind);
    match kind {
        ArtifactKind::Summary => format!(
            "以下は論文の各パートの章ごと要約です。これらを1つの統合された章ごと要約にまとめてください。
重複する章は統合し、章の順序を整理してください。

{format}

余計な説明は不要です。統合された要約のみを出力してください。

---
{combined}
---"
        ),
        ArtifactKind::Critique => format!(
            "以下は論文の各パートから抽出した分析結果です。これらを1つの統合された分析にまとめてください。
重複する内容は統合し、各観点ごとに整理してください。「該当情報なし」の記載は他のパートに情報があれば省いてください。

{format}

余計な説明は不要です。統合された分析結果のみを出力してください。

---
{combined}
---"
        ),
    }
}

/// Prompt for a document small enough to send in one call.
pub(crate) fn direct_prompt(kind: ArtifactKind, text: &str) -> String {
    let format = format_block(kind);
    let instruction = match kind {
        ArtifactKind::Summary => {
            "以下の論文について、章ごとに、多くの要約項目で日本語を使って要約してください。"
        }
        ArtifactKind::Critique => {
            "あなたはトップジャーナルの論文査読者です。以下の論文について、新規性、言及されている全ての関連研究との相違点、有効性、信頼性を、日本語を使って、まとめてください。"
        }
    };
    format!(
        "{instruction}
以下の形式に従ってMarkdown形式で出力してください。余計な説明は不要です。

{format}

---
{text}
---"
    )
}

/// Prompt handing a whole document to the delegated agent through files.
pub(crate) fn whole_document_prompt(
    kind: ArtifactKind,
    input: &Path,
    output: &Path,
    segment_chars: usize,
) -> String {
    let format = format_block(kind);
    let task = match kind {
        ArtifactKind::Summary => "論文全体を章・セクションごとに要約してください。",
        ArtifactKind::Critique => {
            "論文全体について、新規性、言及されている全ての関連研究との相違点、有効性、信頼性を査読者の立場でまとめてください。"
        }
    };
    format!(
        "ファイル {input} に論文のテキストが保存されています。
ファイルは長いため、約{segment_chars}文字ずつ順番に読み進め、全体を読み終えてから結果を作成してください。
{task}

{format}

結果はファイル {output} に書き込んでください。余計な説明は不要です。",
        input = input.display(),
        output = output.display(),
    )
}
