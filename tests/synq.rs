// Tests for synq
//
//  Copyright (C) 2023 The synbind contributors.
//
//  This file is part of synbind.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const SELECT: &str = "tests/data/select.xml";

#[test]
fn query_invalid_argument() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg("-z");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("Unrecognized option:"));

    Ok(())
}

#[test]
fn query_missing_input_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg("--xml");
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("INPUT"));

    Ok(())
}

#[test]
fn query_missing_action() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg(SELECT);
    cmd.assert()
        .failure()
        .code(exitcode::USAGE)
        .stderr(predicate::str::contains("--query or --xml"));

    Ok(())
}

#[test]
fn query_nonexistent_input() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg("tests/data/does-not-exist.xml").arg("--xml");
    cmd.assert()
        .failure()
        .code(exitcode::NOINPUT)
        .stderr(predicate::str::contains("fatal: failed to query"));

    Ok(())
}

#[test]
fn query_node_set_prints_paths() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg(SELECT).arg("-q").arg("//columnRef");
    cmd.assert().success().stdout(
        "/selectStmt/columnList/columnRef\ta\n\
         /selectStmt/columnList/columnRef\tb\n",
    );

    Ok(())
}

#[test]
fn query_scalars_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg(SELECT)
        .arg("-q")
        .arg("count(//columnRef)")
        .arg("--query")
        .arg("joinStrings(',', //columnRef)");
    cmd.assert().success().stdout("2\na,b\n");

    Ok(())
}

#[test]
fn query_invalid_query() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg(SELECT).arg("-q").arg("count(");
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("query `count(`"));

    Ok(())
}

#[test]
fn dump_xml_with_intervals() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg(SELECT).arg("--xml");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with(
            "<selectStmt start=\"0\" end=\"5\">",
        ))
        .stdout(predicate::str::contains(
            "<tableRef start=\"4\" end=\"5\">t</tableRef>",
        ));

    Ok(())
}

#[test]
fn reject_mixed_content() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("synq")?;
    cmd.arg("tests/data/mixed.xml").arg("--xml");
    cmd.assert()
        .failure()
        .code(exitcode::DATAERR)
        .stderr(predicate::str::contains("mixes text with child elements"));

    Ok(())
}
