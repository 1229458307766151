//! `kiln build` integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn copies_sources_into_target() {
  let env = TestEnv::new();
  env.write_source("src/hello.txt", "hello");
  env.write_source("src/nested/world.txt", "world");
  env.write_source("README.txt", "not a source");

  env
    .kiln_cmd()
    .arg("build")
    .arg(env.project_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Built 2 targets"));

  assert_eq!(env.read_output("hello.txt"), "hello");
  assert_eq!(env.read_output("nested/world.txt"), "world");
  assert!(!env.project_path().join("target/README.txt").exists());
}

#[test]
fn second_build_is_up_to_date() {
  let env = TestEnv::new();
  env.write_source("src/hello.txt", "hello");

  env.kiln_cmd().arg("build").arg(env.project_path()).assert().success();

  env
    .kiln_cmd()
    .args(["build", "--sequential"])
    .arg(env.project_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to build"))
    .stdout(predicate::str::contains("Up to date: 1"));
}

#[test]
fn output_flag_overrides_environment() {
  let env = TestEnv::new();
  env.write_source("src/hello.txt", "hello");
  let from_env = env.temp.path().join("from-env");
  let from_flag = env.temp.path().join("from-flag");

  env
    .kiln_cmd()
    .env("KILN_OUTPUT_DIR", &from_env)
    .arg("build")
    .arg(env.project_path())
    .arg("--output")
    .arg(&from_flag)
    .args(["-j", "2"])
    .assert()
    .success();

  assert_eq!(std::fs::read_to_string(from_flag.join("hello.txt")).unwrap(), "hello");
  assert!(!from_env.exists());
}

#[test]
fn json_report_lists_built_targets() {
  let env = TestEnv::new();
  env.write_source("src/a.txt", "a");

  let output = env
    .kiln_cmd()
    .args(["build", "--format", "json"])
    .arg(env.project_path())
    .output()
    .unwrap();
  assert!(output.status.success());

  let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(outcome["platform"], "copy");
  assert_eq!(outcome["mode"], "pooled");
  assert_eq!(outcome["report"]["built"][0]["id"], "a");
  assert_eq!(outcome["report"]["built"][0]["suffix"], "txt");
  assert_eq!(outcome["report"]["failed"].as_array().unwrap().len(), 0);
}

#[test]
fn unknown_platform_fails() {
  let env = TestEnv::new();

  env
    .kiln_cmd()
    .args(["build", "--platform", "native"])
    .arg(env.project_path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown build platform 'native'"));
}

#[test]
fn missing_project_directory_fails() {
  let env = TestEnv::new();

  env
    .kiln_cmd()
    .arg("build")
    .arg(env.temp.path().join("nowhere"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("Project directory not found"));
}

#[test]
fn invalid_jobs_variable_fails() {
  let env = TestEnv::new();

  env
    .kiln_cmd()
    .env("KILN_JOBS", "many")
    .arg("build")
    .arg(env.project_path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("KILN_JOBS must be a positive integer"));
}
