use feder_core::service::templates::today_iso;
use feder_core::{
    CoreConfig, DocumentController, DocumentState, FsStorage, NoPrompt, OpenOutcome, Persona,
    SaveOutcome, UserSettings,
};
use std::fs;
use std::time::{Duration, Instant};

fn open(dir: &std::path::Path, now: Instant) -> DocumentController<FsStorage> {
    let mut controller = DocumentController::new(
        FsStorage::open(dir).unwrap(),
        CoreConfig::default(),
        UserSettings::default(),
        now,
    );
    controller
        .open_project(FsStorage::open(dir).unwrap(), "Scenario", &mut NoPrompt)
        .unwrap();
    controller
}

#[test]
fn frontmatter_document_loads_clean() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("main.md"),
        "---\ntitle: Report\nauthors:\n  - name: A\n---\n\nBody text",
    )
    .unwrap();

    let controller = open(dir.path(), Instant::now());
    let metadata = controller.metadata().unwrap();
    assert_eq!(metadata.text("title").as_deref(), Some("Report"));
    let authors = metadata.get("authors").unwrap().as_sequence().unwrap();
    assert_eq!(authors[0]["name"].as_str(), Some("A"));
    assert_eq!(controller.content(), "Body text");
    assert!(!controller.is_dirty());
    assert_eq!(controller.state(), DocumentState::Clean);
}

#[test]
fn preview_follows_content_only_on_save_without_live_preview() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.md"), "first").unwrap();
    let now = Instant::now();
    let mut controller = open(dir.path(), now);

    controller.set_content("second", now).unwrap();
    controller.tick(now + Duration::from_secs(2));
    assert_eq!(controller.preview_content(), "first");

    assert_eq!(
        controller.save(&mut NoPrompt).unwrap(),
        SaveOutcome::Saved("main.md".to_string())
    );
    assert_eq!(controller.preview_content(), controller.content());
    assert_eq!(fs::read_to_string(dir.path().join("main.md")).unwrap(), "second");

    let sidecar: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("project_metadata.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(sidecar["name"], "Scenario");
    assert_eq!(sidecar["mode"], "researcher");
}

#[test]
fn checkbox_toggle_round_trips_through_the_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("main.md"),
        "---\ntitle: Tasks\n---\n\n# Today\n- [ ] write\n- [ ] review",
    )
    .unwrap();
    let mut controller = open(dir.path(), Instant::now());

    let rendered = controller.render("2026-03-01").unwrap();
    let patch = rendered.checkboxes()[0].patch.unwrap();
    assert!(controller.apply_patch(&patch).unwrap());
    controller.save(&mut NoPrompt).unwrap();

    let saved = fs::read_to_string(dir.path().join("main.md")).unwrap();
    assert!(saved.ends_with("# Today\n- [x] write\n- [ ] review"));
    assert!(saved.starts_with("---\ntitle: Tasks\n---\n\n"));
}

#[test]
fn new_scholar_project_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let now = Instant::now();
    let mut controller = DocumentController::new(
        FsStorage::open(dir.path()).unwrap(),
        CoreConfig::default(),
        UserSettings::default(),
        now,
    );
    let outcome = controller
        .create_project(
            FsStorage::create(dir.path().join("term")).unwrap(),
            "Term",
            Persona::Scholar,
            true,
            &today_iso(),
            &mut NoPrompt,
        )
        .unwrap();
    assert_eq!(outcome, OpenOutcome::Opened("me/todo.md".to_string()));
    assert!(dir.path().join("term/course 1/lecture1.md").is_file());
    assert!(dir.path().join("term/project_metadata.json").is_file());
    assert_eq!(controller.content(), "# To Do\n\n- [ ] Task 1");
}
