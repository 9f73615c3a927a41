// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    ssh = { "git@github.com:acme/widgets.git", "widgets" },
    ssh_no_suffix = { "git@github.com:acme/widgets", "widgets" },
    https = { "https://github.com/acme/widgets.git", "widgets" },
    https_no_suffix = { "https://gitlab.com/acme/widgets", "widgets" },
    nested_group = { "https://gitlab.example.com/group/sub/widgets.git", "widgets" },
    dotted_name = { "git@github.com:acme/widgets.rs.git", "widgets.rs" },
)]
fn repo_name_extraction(url: &str, expected: &str) {
    assert_eq!(repo_name_from_url(url).as_deref(), Some(expected));
}

#[test]
fn bare_name_has_no_separator() {
    assert_eq!(repo_name_from_url("widgets"), None);
}

#[parameterized(
    github_ssh = { "git@github.com:acme/x.git", GitHost::Github },
    github_https = { "https://github.com/acme/x", GitHost::Github },
    gitlab_saas = { "https://gitlab.com/acme/x", GitHost::Gitlab },
    gitlab_self_hosted = { "https://gitlab.corp.example/acme/x", GitHost::Gitlab },
    other = { "https://bitbucket.org/acme/x", GitHost::None },
)]
fn host_classification(url: &str, expected: GitHost) {
    assert_eq!(classify_host(url), expected);
}

#[tokio::test]
async fn non_repo_directory_yields_no_info() {
    let dir = tempfile::tempdir().unwrap();
    // Either git is absent (command error) or reports "not a repository";
    // both degrade to None.
    assert!(git_info(dir.path()).await.is_none());
    assert!(origin_url(dir.path()).await.is_none());
}
