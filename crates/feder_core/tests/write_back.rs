use feder_core::render::patch::apply_to_body;
use feder_core::{render_document, Bibliography, Metadata, Patch, Persona, RenderInput, ViewState};

fn render(body: &str) -> feder_core::RenderedDocument {
    let metadata = Metadata::new();
    let bibliography = Bibliography::new();
    let view = ViewState::default();
    render_document(&RenderInput {
        body,
        metadata: &metadata,
        project: None,
        persona: Persona::Scholar,
        bibliography: &bibliography,
        view: &view,
        today: "2026-03-01",
    })
}

const BODY: &str = "Intro [@x]\n\n# Week 1\n\n- [ ] read chapter\n- [X] lab\n  - [ ] nested\n\n```\n- [ ] not a task\n```\n\n# Week 2\n\n* [ ] star bullet\n> - [ ] quoted";

#[test]
fn toggling_each_checkbox_changes_only_its_line() {
    let rendered = render(BODY);
    let original: Vec<&str> = BODY.split('\n').collect();

    let patches: Vec<Patch> = rendered
        .checkboxes()
        .into_iter()
        .filter_map(|checkbox| checkbox.patch)
        .collect();
    assert_eq!(patches.len(), 4);

    for patch in patches {
        let Patch::ToggleCheckbox { line, checked } = patch else {
            panic!("unexpected patch {patch:?}");
        };
        let patched = apply_to_body(&patch, BODY).unwrap();
        let patched_lines: Vec<&str> = patched.split('\n').collect();
        assert_eq!(patched_lines.len(), original.len());
        for (index, (before, after)) in original.iter().zip(&patched_lines).enumerate() {
            if index == line {
                assert_ne!(before, after);
                let marker = if checked { "[ ]" } else { "[x]" };
                assert!(after.contains(marker), "{after}");
            } else {
                assert_eq!(before, after);
            }
        }
    }
}

#[test]
fn quoted_task_is_read_only() {
    let rendered = render(BODY);
    let read_only = rendered
        .checkboxes()
        .into_iter()
        .filter(|checkbox| checkbox.patch.is_none())
        .count();
    assert_eq!(read_only, 1);
}

#[test]
fn stale_patch_is_a_silent_no_op() {
    let rendered = render("# T\n- [ ] a");
    let patch = rendered.checkboxes()[0].patch.unwrap();
    assert_eq!(apply_to_body(&patch, "# T\n\n- [ ] a"), None);
    assert_eq!(apply_to_body(&patch, "# T\n- [x] a"), None);
}
