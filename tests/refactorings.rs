//! Extract method, inline method and ambiguous matches.

mod common;

use common::{TestRepo, control, line_of, version};
use refblame::models::{BlameReason, ChangeType, ElementId, ElementKind};
use refblame::{Tracker, TrackerConfig};

const README: &str = "demo\n";

const RENDER_INLINE: &str = "package demo;

public class Report {
    public void render() {
        header();
        section(1);
        section(2);
        section(3);
        footer();
    }
}
";

const RENDER_EXTRACTED: &str = "package demo;

public class Report {
    public void render() {
        header();
        sections();
        footer();
    }

    private void sections() {
        section(1);
        section(2);
        section(3);
    }
}
";

#[test]
fn extracted_method_is_blamed_on_the_extraction() {
    let mut repo = TestRepo::new();
    let c0 = repo.commit("Initial commit", &[], &[("README.md", README)]);
    let c1 = repo.commit(
        "Add report",
        &[c0],
        &[("README.md", README), ("Report.java", RENDER_INLINE)],
    );
    let c2 = repo.commit_as(
        "Bob",
        "Extract sections",
        &[c1],
        &[("README.md", README), ("Report.java", RENDER_EXTRACTED)],
    );

    let tracker = repo.tracker();
    let head = version(&tracker, c2);

    let element = tracker
        .blame_element(&head, "sections", None, &control())
        .unwrap();
    assert_eq!(element.commit, c2.to_string());
    assert_eq!(element.reason, BlameReason::Extracted);
    assert_eq!(element.changes, vec![ChangeType::ExtractMethod]);
    assert_eq!(element.author, "Bob");

    // The moved lines still belong to whoever wrote them in `render`.
    let line = tracker
        .blame_line(
            &head,
            "Report.java",
            line_of(RENDER_EXTRACTED, "section(2);"),
            &control(),
        )
        .unwrap();
    assert_eq!(line.commit, c1.to_string());
    assert_eq!(line.reason, BlameReason::Introduced);
    assert_eq!(line.element_name, "render");
    assert_eq!(line.line_number, line_of(RENDER_INLINE, "section(2);"));

    // The new call site is the extraction's own work.
    let call = tracker
        .blame_line(
            &head,
            "Report.java",
            line_of(RENDER_EXTRACTED, "sections();"),
            &control(),
        )
        .unwrap();
    assert_eq!(call.commit, c2.to_string());
    assert_eq!(call.reason, BlameReason::Changed);
}

const SETUP_SPLIT: &str = "package demo;

public class Setup {
    public void start() {
        connect();
        configure();
    }

    private void configure() {
        loadDefaults();
        applyOverrides();
    }
}
";

const SETUP_INLINED: &str = "package demo;

public class Setup {
    public void start() {
        connect();
        loadDefaults();
        applyOverrides();
    }
}
";

#[test]
fn inlined_lines_keep_their_original_author() {
    let mut repo = TestRepo::new();
    let c0 = repo.commit("Initial commit", &[], &[("README.md", README)]);
    let c1 = repo.commit(
        "Add setup",
        &[c0],
        &[("README.md", README), ("Setup.java", SETUP_SPLIT)],
    );
    let c2 = repo.commit_as(
        "Bob",
        "Inline configure",
        &[c1],
        &[("README.md", README), ("Setup.java", SETUP_INLINED)],
    );

    let tracker = repo.tracker();
    let head = version(&tracker, c2);

    let line = tracker
        .blame_line(
            &head,
            "Setup.java",
            line_of(SETUP_INLINED, "applyOverrides();"),
            &control(),
        )
        .unwrap();
    assert_eq!(line.commit, c1.to_string());
    assert_eq!(line.element_name, "configure");
    assert_eq!(line.element_key, "demo.Setup#configure()");

    let view = tracker
        .track_history(&head, "start", None, false, &control())
        .unwrap();
    let at_inline: Vec<Vec<ChangeType>> = view
        .entries
        .iter()
        .filter(|e| e.commit == c2.to_string())
        .map(|e| e.changes.iter().map(|c| c.change_type).collect())
        .collect();
    assert_eq!(at_inline.len(), 2);
    assert!(at_inline.contains(&vec![ChangeType::BodyChange, ChangeType::InlineMethod]));
    assert!(at_inline.contains(&vec![ChangeType::InlineMethod]));

    tracker.graph().check_invariants().unwrap();
}

const TWINS: &str = "package demo;

public class Twins {
    public int first() {
        int total = 0;
        return total;
    }

    public int second() {
        int total = 0;
        return total;
    }
}
";

const MERGED_TWIN: &str = "package demo;

public class Twins {
    public int merged() {
        int total = 0;
        return total;
    }
}
";

fn twins_repo() -> (TestRepo, git2::Oid, git2::Oid) {
    let mut repo = TestRepo::new();
    let c0 = repo.commit("Initial commit", &[], &[("README.md", README)]);
    let c1 = repo.commit(
        "Add twins",
        &[c0],
        &[("README.md", README), ("Twins.java", TWINS)],
    );
    let c2 = repo.commit(
        "Merge twins",
        &[c1],
        &[("README.md", README), ("Twins.java", MERGED_TWIN)],
    );
    (repo, c1, c2)
}

#[test]
fn equally_plausible_matches_are_reported() {
    let (repo, c1, c2) = twins_repo();
    let tracker = repo.tracker();
    let head = version(&tracker, c2);

    let result = tracker
        .blame_element(&head, "merged", None, &control())
        .unwrap();

    assert_eq!(result.commit, c1.to_string());
    // Same similarity, so the nearer declaration wins.
    assert_eq!(result.element_key, "demo.Twins#first()");
    assert_eq!(result.warnings.len(), 1);

    let warning = &result.warnings[0];
    assert_eq!(warning.commit, c2.to_string());
    assert_eq!(warning.element_key, "demo.Twins#merged()");
    assert_eq!(warning.chosen, "demo.Twins#first() (Twins.java)");
    assert_eq!(warning.discarded, vec!["demo.Twins#second() (Twins.java)"]);
    assert_eq!(warning.policy, "similarity,line-delta,key");
}

#[test]
fn tie_break_policy_is_configurable() {
    let (repo, _, c2) = twins_repo();
    let config = TrackerConfig {
        tie_break: "key".parse().unwrap(),
        ..TrackerConfig::default()
    };
    let tracker = Tracker::open(repo.dir.path(), config).unwrap();
    let head = version(&tracker, c2);

    let result = tracker
        .blame_element(&head, "merged", None, &control())
        .unwrap();

    assert_eq!(result.element_key, "demo.Twins#first()");
    assert_eq!(result.warnings[0].policy, "key");
}

const TOTALS: &str = "package demo;

public class B {
    public int total(int a, int b) {
        return a + b;
    }
}
";

const TOTALS_WITH_OTHER: &str = "package demo;

public class B {
    public int total(int a, int b) {
        return a + b;
    }

    public void other() {
        log();
    }
}
";

const PASTED: &str = "package demo;

public class A {
    public int total(int a, int b) {
        return a + b;
    }
}
";

#[test]
fn copy_into_another_file_starts_a_new_history() {
    let mut repo = TestRepo::new();
    let c1 = repo.commit("Add totals", &[], &[("B.java", TOTALS)]);
    let c2 = repo.commit_as(
        "Bob",
        "Copy total into A",
        &[c1],
        &[("A.java", PASTED), ("B.java", TOTALS_WITH_OTHER)],
    );

    let tracker = repo.tracker();
    let head = version(&tracker, c2);

    let copy = tracker
        .blame_element(&head, "demo.A#total(int,int)", None, &control())
        .unwrap();
    assert_eq!(copy.commit, c2.to_string());
    assert_eq!(copy.reason, BlameReason::Introduced);
    assert_eq!(copy.file_path, "A.java");

    let original = tracker
        .blame_element(&head, "demo.B#total(int,int)", None, &control())
        .unwrap();
    assert_eq!(original.commit, c1.to_string());
    assert_eq!(original.reason, BlameReason::RepositoryRoot);

    // The original keeps a single descendant.
    let original_at_root = tracker
        .graph()
        .node(&ElementId {
            kind: ElementKind::Method,
            key: "demo.B#total(int,int)".to_string(),
            version: c1.to_string(),
        })
        .unwrap()
        .unwrap();
    let descendants = tracker
        .graph()
        .descendants_of(&original_at_root.element.id())
        .unwrap();
    assert_eq!(descendants.len(), 1);
    assert_eq!(descendants[0].target.file_path, "B.java");

    tracker.graph().check_invariants().unwrap();
}
