//! Club Lifecycle Integration Test
//!
//! Drives the registry through a member file on disk:
//! Registry → Member → rules/resolver → commit/rollback → FileStore → reload

use club_registry::{
    CommitError, EditState, FieldName, FileStore, MemberHandle, MemberKind, PersistenceError,
    Registry, RollbackError, SearchOutcome,
};
use tempfile::TempDir;

fn store(temp: &TempDir) -> FileStore {
    FileStore::new(temp.path().join("BKCustomers.dat"))
}

fn add(registry: &mut Registry, kind: MemberKind, fields: &[(FieldName, &str)]) -> MemberHandle {
    let handle = registry.add_member(kind);
    for (field, value) in fields {
        registry.stage(handle, *field, *value).unwrap();
    }
    handle
}

fn john(id: &str) -> Vec<(FieldName, &str)> {
    vec![
        (FieldName::Id, id),
        (FieldName::Name, "John"),
        (FieldName::Surname, "Doe"),
        (FieldName::Tel, "+(1)23-4567890"),
    ]
}

#[test]
fn test_first_run_starts_empty() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::load(&store(&temp)).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn test_duplicate_person_is_rejected_and_survives_restart() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    let mut registry = Registry::load(&store).unwrap();

    let first = add(&mut registry, MemberKind::Person, &john("1-2345678|2"));
    registry.commit(first).unwrap();

    let second = add(&mut registry, MemberKind::Person, &john("1-2345678|2"));
    match registry.commit(second) {
        Err(CommitError::Duplicate(duplicates)) => {
            assert_eq!(duplicates.len(), 1);
            assert_eq!(duplicates[0].field, FieldName::Id);
            assert_eq!(duplicates[0].key, "1-2345678|2");
        }
        other => panic!("expected duplicate id, got {other:?}"),
    }
    let rejected = registry.get(second).unwrap();
    assert_eq!(rejected.state(), EditState::Draft);
    assert_eq!(rejected.error_mark(), Some(FieldName::Id));

    registry.save(&store).unwrap();
    let reloaded = Registry::load(&store).unwrap();
    assert_eq!(reloaded.len(), 1, "the never-committed draft is dropped on load");
    assert_eq!(reloaded.members()[0].handle(), first);
}

#[test]
fn test_every_kind_found_by_its_credentials_after_reload() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    let mut registry = Registry::new();

    let person = add(&mut registry, MemberKind::Person, &john("1-1111111|1"));
    let mut soldier_fields = john("2-2222222|2");
    soldier_fields.push((FieldName::PersonalNum, "R/1234567"));
    let soldier = add(&mut registry, MemberKind::Soldier, &soldier_fields);
    let mut student_fields = john("3-3333333|3");
    student_fields.push((FieldName::StudentId, "ABC/12345"));
    let student = add(&mut registry, MemberKind::Student, &student_fields);
    for handle in [person, soldier, student] {
        registry.commit(handle).unwrap();
    }
    registry.save(&store).unwrap();

    let mut reloaded = Registry::load(&store).unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(reloaded.search("1-1111111|1"), SearchOutcome::Found(person));
    assert_eq!(reloaded.search("R/1234567"), SearchOutcome::Found(soldier));
    assert_eq!(reloaded.search("12345"), SearchOutcome::Found(student));
    assert_eq!(reloaded.search("ABC/12345"), SearchOutcome::NotFound);
    assert!(reloaded.get(student).unwrap().is_open());
}

#[test]
fn test_student_number_clash_across_faculties() {
    let temp = TempDir::new().unwrap();
    let mut registry = Registry::load(&store(&temp)).unwrap();

    let mut first = john("1-1111111|1");
    first.push((FieldName::StudentId, "ABC/12345"));
    let first = add(&mut registry, MemberKind::Student, &first);
    registry.commit(first).unwrap();

    let mut second = john("2-2222222|2");
    second.push((FieldName::StudentId, "XYZ/12345"));
    let second = add(&mut registry, MemberKind::Student, &second);
    match registry.commit(second) {
        Err(CommitError::Duplicate(duplicates)) => {
            assert_eq!(duplicates[0].field, FieldName::StudentId);
            assert_eq!(duplicates[0].key, "12345");
        }
        other => panic!("expected duplicate student number, got {other:?}"),
    }
}

#[test]
fn test_commit_rollback_commit_is_stable() {
    let temp = TempDir::new().unwrap();
    let mut registry = Registry::load(&store(&temp)).unwrap();
    let handle = add(&mut registry, MemberKind::Person, &john("1-2345678|2"));

    assert_eq!(registry.rollback(handle), Err(RollbackError::NeverCommitted));

    registry.commit(handle).unwrap();
    let committed = registry.get(handle).unwrap().committed().clone();

    registry.stage(handle, FieldName::Name, "Jack").unwrap();
    registry.rollback(handle).unwrap();
    assert_eq!(registry.get(handle).unwrap().draft(), &committed);

    registry.commit(handle).unwrap();
    assert_eq!(registry.get(handle).unwrap().committed(), &committed);
}

#[test]
fn test_invalid_field_marks_form_and_keeps_committed_record() {
    let temp = TempDir::new().unwrap();
    let mut registry = Registry::load(&store(&temp)).unwrap();
    let handle = add(&mut registry, MemberKind::Person, &john("1-2345678|2"));
    registry.commit(handle).unwrap();

    registry.stage(handle, FieldName::Surname, "doe").unwrap();
    let err = registry.commit(handle).unwrap_err();
    assert!(matches!(err, CommitError::Invalid(e) if e.field == FieldName::Surname));

    let member = registry.get(handle).unwrap();
    assert_eq!(member.error_mark(), Some(FieldName::Surname));
    assert_eq!(member.committed().get(FieldName::Surname), Some("Doe"));
}

#[test]
fn test_corrupt_member_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    std::fs::write(store.path(), b"definitely not bincode").unwrap();

    match Registry::load(&store) {
        Err(PersistenceError::Corrupt { path, .. }) => assert_eq!(path, store.path()),
        other => panic!("expected corrupt file error, got {other:?}"),
    }
}
