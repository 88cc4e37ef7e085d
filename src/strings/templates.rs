//! # Templates
//!
//! Starter files for the `create_project` templates, as `(relative path, content)` pairs.

pub const REACT: &[(&str, &str)] = &[
    ("package.json", r#"{"name": "react-app", "version": "1.0.0"}"#),
    (
        "src/App.js",
        "import React from \"react\";\n\nfunction App() {\n  return <div>Hello, React!</div>;\n}\n\nexport default App;",
    ),
];

pub const NODE: &[(&str, &str)] = &[
    ("package.json", r#"{"name": "node-app", "version": "1.0.0"}"#),
    ("index.js", "console.log(\"Hello, Node.js!\");"),
];

pub const PYTHON: &[(&str, &str)] = &[
    ("main.py", "print(\"Hello, Python!\")"),
    ("requirements.txt", ""),
];

/// Looks up a template by its (case-insensitive) name.
pub fn starter_files(template: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match template.to_ascii_lowercase().as_str() {
        "react" => Some(REACT),
        "node" => Some(NODE),
        "python" => Some(PYTHON),
        _ => None,
    }
}
