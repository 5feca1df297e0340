//! Two branches edit the same method and are merged.

mod common;

use common::{TestRepo, control, line_of, version};
use refblame::models::{BlameReason, ChangeType, ElementId, ElementKind};

const BASE: &str = "package demo;

public class Job {
    public void run() {
        prepare();
        execute();
    }
}
";

const LEFT: &str = "package demo;

public class Job {
    public void run() {
        prepare();
        execute();
        report();
    }
}
";

const RIGHT: &str = "package demo;

public class Job {
    public void run() {
        validate();
        prepare();
        execute();
    }
}
";

const MERGED: &str = "package demo;

public class Job {
    public void run() {
        validate();
        prepare();
        execute();
        report();
    }
}
";

const PATH: &str = "src/demo/Job.java";

#[test]
fn merge_lines_are_blamed_on_the_branch_that_wrote_them() {
    let mut repo = TestRepo::new();
    let root = repo.commit("Initial commit", &[], &[("README.md", "job\n")]);
    let base = repo.commit("Add job", &[root], &[("README.md", "job\n"), (PATH, BASE)]);
    let left = repo.commit("Report", &[base], &[("README.md", "job\n"), (PATH, LEFT)]);
    let right = repo.commit("Validate", &[base], &[("README.md", "job\n"), (PATH, RIGHT)]);
    let merge = repo.commit(
        "Merge validate",
        &[left, right],
        &[("README.md", "job\n"), (PATH, MERGED)],
    );

    let tracker = repo.tracker();
    let head = version(&tracker, merge);
    let blame = |text: &str| {
        tracker
            .blame_line(&head, PATH, line_of(MERGED, text), &control())
            .unwrap()
    };

    let report = blame("report();");
    assert_eq!(report.commit, left.to_string());
    assert_eq!(report.reason, BlameReason::Changed);

    let validate = blame("validate();");
    assert_eq!(validate.commit, right.to_string());
    assert_eq!(validate.reason, BlameReason::Changed);

    let prepare = blame("prepare();");
    assert_eq!(prepare.commit, base.to_string());
    assert_eq!(prepare.reason, BlameReason::Introduced);
}

#[test]
fn merge_node_has_an_edge_from_every_parent() {
    let mut repo = TestRepo::new();
    let root = repo.commit("Initial commit", &[], &[("README.md", "job\n")]);
    let base = repo.commit("Add job", &[root], &[("README.md", "job\n"), (PATH, BASE)]);
    let left = repo.commit("Report", &[base], &[("README.md", "job\n"), (PATH, LEFT)]);
    let right = repo.commit("Validate", &[base], &[("README.md", "job\n"), (PATH, RIGHT)]);
    let merge = repo.commit(
        "Merge validate",
        &[left, right],
        &[("README.md", "job\n"), (PATH, MERGED)],
    );

    let tracker = repo.tracker();
    let head = version(&tracker, merge);
    let view = tracker
        .track_history(&head, "run", Some(PATH), false, &control())
        .unwrap();

    let at_merge: Vec<_> = view
        .entries
        .iter()
        .filter(|e| e.commit == merge.to_string())
        .collect();
    let mut sources: Vec<_> = at_merge.iter().map(|e| e.before.commit.clone()).collect();
    sources.sort();
    let mut parents = vec![left.to_string(), right.to_string()];
    parents.sort();
    assert_eq!(sources, parents);
    // Newest source first.
    assert_eq!(at_merge[0].before.commit, right.to_string());
    for entry in &at_merge {
        assert_eq!(entry.changes[0].change_type, ChangeType::BodyChange);
    }

    // Both branches lead back to the same introduction.
    assert_eq!(view.terminals.len(), 1);
    assert_eq!(view.terminals[0].element.commit, base.to_string());
    assert_eq!(view.entries.len(), 4);

    tracker.graph().check_invariants().unwrap();
}

/// `LEFT` with the class never closed.
const LEFT_BROKEN: &str = "package demo;

public class Job {
    public void run() {
        prepare();
        execute();
        report();
    }
";

#[test]
fn unparsable_parent_does_not_stop_the_other_branch() {
    let mut repo = TestRepo::new();
    let root = repo.commit("Initial commit", &[], &[("README.md", "job\n")]);
    let base = repo.commit("Add job", &[root], &[("README.md", "job\n"), (PATH, BASE)]);
    let left = repo.commit("Report", &[base], &[("README.md", "job\n"), (PATH, LEFT_BROKEN)]);
    let right = repo.commit("Validate", &[base], &[("README.md", "job\n"), (PATH, RIGHT)]);
    let merge = repo.commit(
        "Merge validate",
        &[left, right],
        &[("README.md", "job\n"), (PATH, MERGED)],
    );

    let tracker = repo.tracker();
    let head = version(&tracker, merge);
    let blame = |text: &str| {
        tracker
            .blame_line(&head, PATH, line_of(MERGED, text), &control())
            .unwrap()
    };

    let validate = blame("validate();");
    assert_eq!(validate.commit, right.to_string());
    assert_eq!(validate.reason, BlameReason::Changed);

    let prepare = blame("prepare();");
    assert_eq!(prepare.commit, base.to_string());
    assert_eq!(prepare.reason, BlameReason::Introduced);

    // Only the broken branch wrote this line, so it stops at the merge.
    let report = blame("report();");
    assert_eq!(report.commit, merge.to_string());
    assert_eq!(report.reason, BlameReason::Changed);

    let node = tracker
        .graph()
        .node(&ElementId {
            kind: ElementKind::Method,
            key: "demo.Job#run()".to_string(),
            version: merge.to_string(),
        })
        .unwrap()
        .unwrap();
    assert!(node.expanded);
    assert_eq!(node.terminal, None);
    assert_eq!(node.unresolved.len(), 1);
    assert_eq!(node.unresolved[0].parent, left.to_string());

    tracker.graph().check_invariants().unwrap();
}

const LEFT_RENAMED: &str = "package demo;

public class Job {
    public void start() {
        prepare();
        execute();
    }
}
";

const MERGED_RENAMED: &str = "package demo;

public class Job {
    public void start() {
        validate();
        prepare();
        execute();
        cleanup();
    }
}
";

#[test]
fn line_written_at_a_merge_reports_every_parent_edge() {
    let mut repo = TestRepo::new();
    let root = repo.commit("Initial commit", &[], &[("README.md", "job\n")]);
    let base = repo.commit("Add job", &[root], &[("README.md", "job\n"), (PATH, BASE)]);
    let left = repo.commit("Rename", &[base], &[("README.md", "job\n"), (PATH, LEFT_RENAMED)]);
    let right = repo.commit("Validate", &[base], &[("README.md", "job\n"), (PATH, RIGHT)]);
    let merge = repo.commit(
        "Merge validate",
        &[left, right],
        &[("README.md", "job\n"), (PATH, MERGED_RENAMED)],
    );

    let tracker = repo.tracker();
    let head = version(&tracker, merge);
    let cleanup = tracker
        .blame_line(&head, PATH, line_of(MERGED_RENAMED, "cleanup();"), &control())
        .unwrap();
    assert_eq!(cleanup.commit, merge.to_string());
    assert_eq!(cleanup.reason, BlameReason::Changed);
    // The first parent only changed the body; the rename came in from the second.
    assert!(cleanup.changes.contains(&ChangeType::BodyChange));
    assert!(cleanup.changes.contains(&ChangeType::Rename));
    assert_eq!(cleanup.changes.len(), 2);

    let validate = tracker
        .blame_line(&head, PATH, line_of(MERGED_RENAMED, "validate();"), &control())
        .unwrap();
    assert_eq!(validate.commit, right.to_string());
}
