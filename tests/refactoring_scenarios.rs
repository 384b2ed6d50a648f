//! End-to-end refactoring scenarios against a real project tree.

use rope_rs::prelude::*;
use tempfile::tempdir;

#[test]
fn introduce_factory_basic() {
    let dir = tempdir().unwrap();
    let project = Project::new(dir.path()).unwrap();
    let root = project.get_root_folder();
    let file = root.create_file("mod.py").unwrap();
    file.write("class AClass(object):\n    pass\n\na_var = AClass()\n").unwrap();

    let text = file.read().unwrap();
    let offset = text.find("AClass").unwrap();
    let op = IntroduceFactory {
        module: file.path().clone(),
        class_offset: offset,
        factory_name: "create".to_string(),
        global_factory: false,
    };
    let mut undo = UndoManager::new();
    op.execute(&project, &mut undo).unwrap();

    let updated = file.read().unwrap();
    assert!(updated.contains("def create(*args, **kwds):"));
    assert!(updated.contains("a_var = AClass.create()"));
}

#[test]
fn introduce_factory_across_modules() {
    let dir = tempdir().unwrap();
    let project = Project::new(dir.path()).unwrap();
    let root = project.get_root_folder();
    let producer = root.create_file("producer.py").unwrap();
    producer.write("class AClass(object):\n    pass\n").unwrap();
    let consumer = root.create_file("consumer.py").unwrap();
    consumer
        .write("from producer import AClass\n\nobj = AClass()\n")
        .unwrap();

    let text = producer.read().unwrap();
    let offset = text.find("AClass").unwrap();
    let op = IntroduceFactory {
        module: producer.path().clone(),
        class_offset: offset,
        factory_name: "new_instance".to_string(),
        global_factory: false,
    };
    let mut undo = UndoManager::new();
    op.execute(&project, &mut undo).unwrap();

    assert!(consumer.read().unwrap().contains("obj = AClass.new_instance()"));
}

#[test]
fn undo_redo_round_trip() {
    let dir = tempdir().unwrap();
    let project = Project::new(dir.path()).unwrap();
    let root = project.get_root_folder();
    let file = root.create_file("mod.py").unwrap();
    file.write("def f():\n    old_name = 1\n    return old_name\n").unwrap();

    let text = file.read().unwrap();
    let offset = text.find("old_name").unwrap();
    let op = Rename::new(file.path().clone(), offset, "new_name");
    let mut undo = UndoManager::new();
    op.execute(&project, &mut undo).unwrap();
    assert!(file.read().unwrap().contains("new_name"));

    undo.undo(&project).unwrap();
    assert!(file.read().unwrap().contains("old_name"));
    assert!(!file.read().unwrap().contains("new_name"));

    undo.redo(&project).unwrap();
    assert!(file.read().unwrap().contains("new_name"));
}

#[test]
fn multi_step_interleaved_undo_redo() {
    let dir = tempdir().unwrap();
    let project = Project::new(dir.path()).unwrap();
    let root = project.get_root_folder();
    let file = root.create_file("mod.py").unwrap();
    file.write("a = 1\n").unwrap();

    let mut undo = UndoManager::new();
    undo.apply(
        &project,
        Change::Content { path: file.path().clone(), old_text: "a = 1\n".into(), new_text: "a = 2\n".into() },
    )
    .unwrap();
    undo.apply(
        &project,
        Change::Content { path: file.path().clone(), old_text: "a = 2\n".into(), new_text: "a = 3\n".into() },
    )
    .unwrap();

    undo.undo(&project).unwrap();
    assert_eq!(file.read().unwrap(), "a = 2\n");

    undo.apply(
        &project,
        Change::Content { path: file.path().clone(), old_text: "a = 2\n".into(), new_text: "a = 4\n".into() },
    )
    .unwrap();
    assert!(!undo.can_redo());
    assert_eq!(file.read().unwrap(), "a = 4\n");

    undo.undo(&project).unwrap();
    undo.undo(&project).unwrap();
    assert_eq!(file.read().unwrap(), "a = 1\n");
}

#[test]
fn encapsulate_field_expands_augmented_assignment() {
    let dir = tempdir().unwrap();
    let project = Project::new(dir.path()).unwrap();
    let root = project.get_root_folder();
    let file = root.create_file("mod.py").unwrap();
    file.write(
        "class Counter(object):\n    def __init__(self):\n        self.count = 0\n\n    def bump(self):\n        self.count += 1\n",
    )
    .unwrap();

    let text = file.read().unwrap();
    let offset = text.find("Counter").unwrap();
    let op = EncapsulateField {
        module: file.path().clone(),
        class_offset: offset,
        field_name: "count".to_string(),
    };
    let mut undo = UndoManager::new();
    op.execute(&project, &mut undo).unwrap();

    let updated = file.read().unwrap();
    assert!(updated.contains("def get_count(self):"));
    assert!(updated.contains("def set_count(self, value):"));
    assert!(updated.contains("self.set_count(self.get_count() + 1)"));
    assert!(updated.contains("self.set_count(0)"));
}

#[test]
fn module_to_package_preserves_importers() {
    let dir = tempdir().unwrap();
    let project = Project::new(dir.path()).unwrap();
    let root = project.get_root_folder();
    let file = root.create_file("utilities.py").unwrap();
    file.write("def helper():\n    return 1\n").unwrap();
    let consumer = root.create_file("consumer.py").unwrap();
    consumer.write("from utilities import helper\n").unwrap();

    let op = ModuleToPackage { module: file.path().clone() };
    let mut undo = UndoManager::new();
    op.execute(&project, &mut undo).unwrap();

    assert!(!root.has_child("utilities.py"));
    let package = project.get_file(ResourcePath::new("utilities/__init__.py")).unwrap();
    assert_eq!(package.read().unwrap(), "def helper():\n    return 1\n");
    // Module's dotted name is unchanged, so the importer needs no rewrite.
    assert_eq!(consumer.read().unwrap(), "from utilities import helper\n");
}

#[test]
fn move_module_removes_stale_from_import() {
    let dir = tempdir().unwrap();
    let project = Project::new(dir.path()).unwrap();
    let root = project.get_root_folder();
    let pkg = root.create_folder("pkg").unwrap();
    let mod4 = pkg.create_file("mod4.py").unwrap();
    mod4.write("x = 1\n").unwrap();
    let mod2 = root.create_file("mod2.py").unwrap();
    mod2.write("from pkg import mod4\nprint(mod4)\n").unwrap();

    let op = MoveModule {
        module: mod4.path().clone(),
        destination_folder: ResourcePath::root(),
    };
    let mut undo = UndoManager::new();
    op.execute(&project, &mut undo).unwrap();

    assert_eq!(mod2.read().unwrap(), "import mod4\nprint(mod4)\n");
    assert!(!pkg.has_child("mod4.py"));
    assert!(project.get_file(ResourcePath::new("mod4.py")).is_ok());
}

#[test]
fn move_removes_stale_from_import_after_rewrite() {
    let dir = tempdir().unwrap();
    let project = Project::new(dir.path()).unwrap();
    let root = project.get_root_folder();
    let source = root.create_file("source.py").unwrap();
    source.write("def moved():\n    return 1\n").unwrap();
    let consumer = root.create_file("consumer.py").unwrap();
    consumer.write("from source import moved\n\nmoved()\n").unwrap();

    let text = source.read().unwrap();
    let offset = text.find("moved").unwrap();
    let op = MoveGlobal {
        module: source.path().clone(),
        offset,
        destination: "destination.py".into(),
    };
    let mut undo = UndoManager::new();
    op.execute(&project, &mut undo).unwrap();

    let consumer_text = consumer.read().unwrap();
    assert!(consumer_text.contains("from destination import moved"));
    assert!(!consumer_text.contains("from source import moved"));
    assert!(!source.read().unwrap().contains("def moved"));
}
