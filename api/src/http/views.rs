use axum::response::Html;
use indoc::formatdoc;
use pdfchat::{
    templates::{render_history, CSS},
    Message,
};

/// Notice shown in the upload sidebar.
pub enum Status<'a> {
    Idle,
    Done { files: usize, chunks: usize },
    Error(&'a str),
}

#[must_use]
pub fn page(history: &[Message], status: &Status<'_>) -> Html<String> {
    let chat = render_history(history);
    let notice = match status {
        Status::Idle => String::new(),
        Status::Done { files, chunks } => {
            format!(r#"<p class="notice">DONE: {files} files, {chunks} chunks indexed.</p>"#)
        }
        Status::Error(error) => format!(
            r#"<p class="notice error">{}</p>"#,
            html_escape::encode_text(error)
        ),
    };

    Html(formatdoc!(
        r#"<!doctype html>
        <html>
        <head>
            <meta charset="utf-8">
            <title>Chat with Your own PDFs</title>
            {CSS}
            <style>
            body {{ display: flex; font-family: sans-serif; margin: 0; }}
            aside {{ width: 22rem; padding: 1.5rem; background: #f0f2f6; min-height: 100vh; }}
            main {{ flex: 1; padding: 1.5rem 3rem; }}
            .notice.error {{ color: #b00020; }}
            </style>
        </head>
        <body>
            <main>
                <h1>Chat with Your own PDFs 📚</h1>
                <form method="post" action="/ask">
                    <label for="question">Ask anything to your PDF:</label>
                    <input id="question" name="question" type="text" autofocus>
                </form>
                {chat}
            </main>
            <aside>
                <h3>Upload your Documents Here:</h3>
                <form method="post" action="/documents" enctype="multipart/form-data">
                    <label for="pdfs">Choose your PDF Files and Press OK</label>
                    <input id="pdfs" name="pdfs" type="file" accept=".pdf" multiple>
                    <button type="submit">OK</button>
                </form>
                {notice}
            </aside>
        </body>
        </html>"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_history_and_notice() {
        let Html(html) = page(
            &[Message::human("what?"), Message::ai("that")],
            &Status::Done {
                files: 2,
                chunks: 7,
            },
        );

        assert!(html.contains("Chat with Your own PDFs"));
        assert!(html.contains("DONE: 2 files, 7 chunks indexed."));
        assert!(html.find("what?").unwrap() < html.find("that").unwrap());
    }

    #[test]
    fn escapes_errors() {
        let Html(html) = page(&[], &Status::Error("<bad>"));

        assert!(html.contains("&lt;bad&gt;"));
    }
}
