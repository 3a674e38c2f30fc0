use quill::diagnostics::SemanticError;
use quill::{DiagnosticKind, Options, Session};
use std::fs;
use std::path::Path;

fn read_demo(name: &str) -> String {
    let path = Path::new("demos").join(name);
    fs::read_to_string(&path).expect("Failed to read demo file")
}

#[test]
fn test_shapes_compiles_cleanly() {
    let source = read_demo("shapes.ql");
    let session = Session::compile(&source, Options::new()).expect("Compilation hit an ICE");

    for diagnostic in session.diagnostics().iter() {
        let location = session.location(diagnostic.span);
        println!("{}:{}: {}", location.line, location.column, diagnostic);
    }
    assert!(session.success());
    assert!(session.types_resolved());
}

#[test]
fn test_broken_reports_everything() {
    let source = read_demo("broken.ql");
    let session = Session::compile(&source, Options::new()).expect("Compilation hit an ICE");

    let found: Vec<(usize, &DiagnosticKind)> = session
        .diagnostics()
        .iter()
        .map(|diagnostic| (session.location(diagnostic.span).line, &diagnostic.kind))
        .collect();
    println!("{:#?}", found);
    assert_eq!(found.len(), 5);

    assert!(matches!(found[0], (13, DiagnosticKind::Lexical(_))));
    assert!(matches!(
        found[1],
        (9, DiagnosticKind::Semantic(SemanticError::UnresolvedMember { .. }))
    ));
    assert!(matches!(
        found[2],
        (14, DiagnosticKind::Semantic(SemanticError::TypeMismatch { .. }))
    ));
    assert!(matches!(
        found[3],
        (16, DiagnosticKind::Semantic(SemanticError::ContinueOutsideLoop))
    ));
    assert!(matches!(
        found[4],
        (17, DiagnosticKind::Semantic(SemanticError::UnresolvedIdentifier { .. }))
    ));
}
