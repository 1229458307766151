//! `kiln modules` integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn lists_the_core_module() {
  let env = TestEnv::new();

  env
    .kiln_cmd()
    .arg("modules")
    .assert()
    .success()
    .stdout(predicate::str::contains("kiln.core 0.3.0"))
    .stdout(predicate::str::contains("1 module activated"));
}

#[test]
fn failed_activation_is_listed_but_not_fatal() {
  let env = TestEnv::new();
  env.write_module("acme.tools", "1.0.0", "acme.tools.Missing", None);

  env
    .kiln_cmd()
    .arg("modules")
    .assert()
    .success()
    .stdout(predicate::str::contains("acme.tools 1.0.0"))
    .stdout(predicate::str::contains("acme.tools.Missing"))
    .stderr(predicate::str::contains("1 module failed to activate"));
}

#[test]
fn json_lists_states() {
  let env = TestEnv::new();
  env.write_module("acme.tools", "2.1.0", "acme.tools.Missing", Some("kiln.core"));

  let output = env.kiln_cmd().args(["modules", "--format", "json"]).output().unwrap();
  assert!(output.status.success());

  let modules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let modules = modules.as_array().unwrap();
  assert_eq!(modules.len(), 2);

  let core = modules.iter().find(|m| m["id"] == "kiln.core").unwrap();
  assert_eq!(core["state"], "activated");
  let tools = modules.iter().find(|m| m["id"] == "acme.tools").unwrap();
  assert_eq!(tools["state"], "failed");
  assert_eq!(tools["version"], "2.1.0");
}

#[test]
fn cyclic_modules_exit_non_zero() {
  let env = TestEnv::new();
  env.write_module("a", "1.0.0", "a.Activator", Some("b"));
  env.write_module("b", "1.0.0", "b.Activator", Some("a"));

  env
    .kiln_cmd()
    .arg("modules")
    .assert()
    .failure()
    .stderr(predicate::str::contains("cyclic module dependency"));
}

#[test]
fn missing_dependency_exits_non_zero() {
  let env = TestEnv::new();
  env.write_module("acme.tools", "1.0.0", "acme.tools.Activator", Some("acme.base"));

  env
    .kiln_cmd()
    .arg("modules")
    .assert()
    .failure()
    .stderr(predicate::str::contains("acme.base"));
}
