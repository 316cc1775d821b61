use question_curator::models::loaders::write_json_atomically;
use question_curator::models::ChapterGroupingFile;
use question_curator::{App, ChapterClassifier, Config, FilterState, Question, OTHERS_GROUP};
use std::collections::BTreeMap;
use std::path::Path;

fn write_grouping(dir: &Path) {
    let mut groups = BTreeMap::new();
    groups.insert(
        "Mechanics".to_string(),
        vec!["laws of motion".to_string(), "work energy".to_string()],
    );
    groups.insert("Electrostatics".to_string(), vec!["electric charges".to_string()]);
    groups.insert(OTHERS_GROUP.to_string(), vec![]);
    let file = ChapterGroupingFile {
        canonical_order: vec![
            "Mechanics".to_string(),
            "Electrostatics".to_string(),
            OTHERS_GROUP.to_string(),
        ],
        groups,
    };
    write_json_atomically(&dir.join("PhysicsChapterGrouping.json"), &file).unwrap();
}

fn config_for(dir: &Path) -> Config {
    Config {
        list_dir: dir.join("QuestionList").display().to_string(),
        grouping_dir: dir.display().to_string(),
        tags_file: dir.join("tags.cfg").display().to_string(),
        set_groups_file: dir.join("QuestionSetGroup.json").display().to_string(),
        questions_file: dir.join("questions.json").display().to_string(),
        output_log_file: dir.join("output.txt").display().to_string(),
        ..Config::default()
    }
}

#[test]
fn test_classifier_substring_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write_grouping(dir.path());
    let config = config_for(dir.path());

    let classifier = ChapterClassifier::for_magazine(&config, "Physics For You").unwrap();
    assert_eq!(classifier.classify("Laws Of Motion - Newton"), "Mechanics");
    assert_eq!(classifier.classify("  ELECTRIC   charges"), "Electrostatics");
    assert_eq!(classifier.classify("Semiconductors"), OTHERS_GROUP);
}

#[test]
fn test_app_loads_snapshot_and_saves_lists() {
    let dir = tempfile::tempdir().unwrap();
    write_grouping(dir.path());
    let config = config_for(dir.path());

    let snapshot = serde_json::json!([
        {"row_number": 1, "qno": 1, "page": 10, "question_set": "Laws of Motion",
         "question_set_name": "JEE Main 2023 Paper 1", "magazine": "Physics For You | March",
         "question_text": "A block slides down an incline"},
        {"row_number": 2, "qno": "2", "page": "11", "question_set": "Electric Charges and Fields",
         "question_set_name": "NEET 2024", "magazine": "Physics For You | April",
         "text": "Two point charges"},
        {"row_number": 3, "qno": "3", "question_set": "Work Energy and Power",
         "question_set_name": "JEE Main 2024 Paper 2", "magazine": "Physics For You | May"}
    ]);
    write_json_atomically(Path::new(&config.questions_file), &snapshot).unwrap();

    let mut app = App::initialize(config.clone()).unwrap();
    app.run().unwrap();

    let session = app.session_mut();
    assert_eq!(session.questions().len(), 3);
    assert_eq!(session.summary().questions, 3);

    let mechanics = FilterState::new().with_chapter("Mechanics");
    let rows: Vec<i64> = session
        .filtered(&mechanics)
        .iter()
        .map(|q| q.row_number)
        .collect();
    assert_eq!(rows, vec![1, 3]);

    assert_eq!(session.save_filtered_as_list("Mechanics Drill", &mechanics).unwrap(), 2);
    session
        .lists_mut()
        .rename("Mechanics Drill", "Mechanics Revision")
        .unwrap();

    // 新会话从磁盘恢复列表
    let mut reopened = App::initialize(config).unwrap();
    reopened.run().unwrap();
    let list = reopened
        .session()
        .lists()
        .get("Mechanics Revision")
        .unwrap();
    assert_eq!(list.row_numbers(), vec![1, 3]);
    assert_eq!(list.metadata.filters.as_ref(), Some(&mechanics));
    assert!(reopened.session().lists().get("Mechanics Drill").is_none());
}

#[test]
fn test_app_without_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    let mut app = App::initialize(config).unwrap();
    app.run().unwrap();

    let session = app.session();
    assert!(session.questions().is_empty());
    assert_eq!(session.set_groups().len(), 3);
    assert!(session.lists().is_empty());
    assert!(dir.path().join("QuestionSetGroup.json").exists());
    assert!(dir.path().join("output.txt").exists());
}

#[test]
fn test_questions_keep_ingested_group_without_chapter_label() {
    let dir = tempfile::tempdir().unwrap();
    write_grouping(dir.path());
    let config = config_for(dir.path());

    let mut app = App::initialize(config).unwrap();
    let mut q = Question::new(7);
    q.group = "Electrostatics".to_string();
    app.session_mut().load_questions(vec![q]).unwrap();

    assert_eq!(app.session().questions()[0].group, "Electrostatics");
}
