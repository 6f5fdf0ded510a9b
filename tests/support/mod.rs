//! Shared fixture helpers for the root binary's integration tests.
//!
//! Every test runs the compiled `aimo` binary against a throwaway
//! directory: a fake AIMO Standard submodule tree (mirroring
//! `aimo-standard`'s own unit-test fixture), the real `vendors/`/`rules/`
//! fixtures already checked into the repository, and a `.aimo/config.toml`
//! pointing at all of it.

use assert_cmd::cargo::cargo_bin;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Command;

/// Builds a minimal-but-valid fake AIMO Standard submodule tree under
/// `submodule_dir`: one taxonomy code per required dimension (so
/// `aggregate_taxonomy_summary`'s fallback never needs to trigger) and an
/// open `{}` manifest schema, which `jsonschema` accepts unconditionally.
pub fn write_standard_fixture(submodule_dir: &Utf8Path) {
    let en_dir = submodule_dir.join("artifacts").join("taxonomy").join("current").join("en");
    std::fs::create_dir_all(&en_dir).unwrap();
    std::fs::write(
        en_dir.join("taxonomy_dictionary.csv"),
        "code,dimension,dimension_name,label,definition,status,introduced_in,scope_notes,examples\n\
         FS-001,FS,Functional Scope,Chat,Conversational assistant,active,0.1.0,,\n\
         FS-002,FS,Functional Scope,Automation,Workflow automation,active,0.1.0,,\n\
         IM-001,IM,Interaction Mode,Interactive,Synchronous interactive use,active,0.1.0,,\n\
         IM-002,IM,Interaction Mode,Batch,Batch or scheduled use,active,0.1.0,,\n\
         UC-001,UC,Use Case,Content Generation,Drafting or generating content,active,0.1.0,,\n\
         UC-002,UC,Use Case,Data Analysis,Analyzing or summarizing data,active,0.1.0,,\n\
         UC-003,UC,Use Case,Collaboration,Team collaboration,active,0.1.0,,\n\
         DT-001,DT,Data Type,Internal,Internal business data,active,0.1.0,,\n\
         DT-002,DT,Data Type,Confidential,Confidential or regulated data,active,0.1.0,,\n\
         CH-001,CH,Channel,Web,Web browser channel,active,0.1.0,,\n\
         CH-002,CH,Channel,API,Direct API channel,active,0.1.0,,\n\
         RS-001,RS,Risk Surface,External GenAI,Third-party GenAI provider,active,0.1.0,,\n\
         RS-002,RS,Risk Surface,Cloud Platform,Cloud platform endpoint,active,0.1.0,,\n\
         RS-003,RS,Risk Surface,SaaS,General SaaS endpoint,active,0.1.0,,\n\
         EV-001,EV,Evidence,Proxy Log,Derived from proxy log evidence,active,0.1.0,,\n\
         EV-002,EV,Evidence,Firewall Log,Derived from firewall log evidence,active,0.1.0,,\n",
    )
    .unwrap();

    let schema_dir = submodule_dir.join("schemas").join("jsonschema");
    std::fs::create_dir_all(&schema_dir).unwrap();
    for name in ["evidence_pack_manifest", "aimo-ev", "aimo-dictionary", "aimo-standard", "shadow-ai-discovery", "agent-activity"] {
        std::fs::write(schema_dir.join(format!("{name}.schema.json")), "{}").unwrap();
    }
}

/// Absolute path to this crate's real `vendors/` fixture directory, shared
/// by every test so the `paloalto` mapping under test is the one actually
/// shipped with the engine rather than a copy.
pub fn real_vendors_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("vendors")
}

/// Absolute path to this crate's real `rules/` fixture directory.
pub fn real_rules_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("rules")
}

/// Writes `.aimo/config.toml` under `work_dir`, pointing persistence and
/// Standard paths at throwaway locations inside `work_dir` and the vendor
/// mapping / rule set at the real fixtures checked into the repository.
pub fn write_config(work_dir: &Utf8Path) {
    let aimo_dir = work_dir.join(".aimo");
    std::fs::create_dir_all(&aimo_dir).unwrap();
    let submodule_dir = work_dir.join("standard-submodule");
    write_standard_fixture(&submodule_dir);

    let config = format!(
        r#"
[paths]
db_path = "{db_path}"
output_dir = "{output_dir}"
vendors_dir = "{vendors_dir}"
rules_dir = "{rules_dir}"
standard_submodule_dir = "{submodule_dir}"
standard_cache_dir = "{cache_dir}"
"#,
        db_path = work_dir.join("run.db"),
        output_dir = work_dir.join("out"),
        vendors_dir = real_vendors_dir(),
        rules_dir = real_rules_dir(),
        submodule_dir = submodule_dir,
        cache_dir = work_dir.join("standard-cache"),
    );
    std::fs::write(aimo_dir.join("config.toml"), config).unwrap();
}

/// Writes a small Palo Alto-shaped CSV export with one row that hits the
/// `genai-openai-suffix-001` rule: an `allow`ed POST to `api.openai.com`
/// with `bytes_sent` above the default 1 MiB predicate-A threshold.
pub fn write_openai_csv(work_dir: &Utf8Path) -> Utf8PathBuf {
    let path = work_dir.join("traffic.csv");
    std::fs::write(
        &path,
        "time_generated,bytes_sent,bytes_received,url,src_user,http_method,action,status\n\
         2024-01-15T10:23:45Z,2097152,4096,https://api.openai.com/v1/chat/completions,alice,POST,allow,200\n\
         2024-01-15T10:24:10Z,512,1024,https://intranet.example.com/portal,bob,GET,allow,200\n",
    )
    .unwrap();
    path
}

/// Builds a `Command` for the compiled `aimo` binary, rooted at `work_dir`
/// so config discovery finds `.aimo/config.toml` there, with the LLM stage
/// disabled (tests only ever need the rule engine) and the Standard
/// resolver's pin check bypassed via a non-pinned version unless the
/// caller overrides `--standard-version` itself.
pub fn aimo_cmd(work_dir: &Utf8Path) -> Command {
    let mut cmd = Command::new(cargo_bin("aimo"));
    cmd.current_dir(work_dir);
    cmd.env("AIMO_DISABLE_LLM", "1");
    cmd.env_remove("ANTHROPIC_API_KEY");
    cmd
}
