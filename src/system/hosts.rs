//! Host lists and host files
//!
//! Parsers for the compact host representations exported by resource
//! managers, and the plain-text host file format handed to launchers (one
//! hostname per line, nothing else).

use crate::error::{LaunchError, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Upper bound on the entries produced by expanding a compact host list
pub const MAX_EXPANDED_HOSTS: usize = 1 << 24;

/// Parse one `count` or `count(xrepeat)` term
fn parse_task_term(term: &str) -> Option<(usize, usize)> {
    match term.split_once('(') {
        Some((count, rest)) => {
            let count = count.trim().parse().ok()?;
            let repeat = rest
                .strip_prefix('x')
                .and_then(|r| r.strip_suffix(')'))
                .and_then(|r| r.trim().parse().ok())?;
            Some((count, repeat))
        }
        None => Some((term.parse().ok()?, 1)),
    }
}

/// Parse `SLURM_TASKS_PER_NODE` into `(count, repeat)` terms
fn parse_task_terms(spec: &str) -> Option<Vec<(usize, usize)>> {
    spec.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse_task_term)
        .collect()
}

/// Expand `SLURM_TASKS_PER_NODE` into one task count per node
///
/// The syntax is a comma-separated list of `count` or `count(xrepeat)`
/// terms: `2(x3),1` means three nodes run 2 tasks each and a fourth node
/// runs 1 task, giving `[2, 2, 2, 1]`. At most `max_nodes` entries are
/// produced.
pub fn parse_tasks_per_node(spec: &str, max_nodes: usize) -> Option<Vec<usize>> {
    let mut counts = Vec::new();
    for (count, repeat) in parse_task_terms(spec)? {
        let room = max_nodes - counts.len();
        counts.extend(std::iter::repeat(count).take(repeat.min(room)));
        if counts.len() == max_nodes {
            break;
        }
    }
    Some(counts)
}

/// Total task count described by `SLURM_TASKS_PER_NODE`
///
/// Returns `None` for a malformed value or a total that overflows.
pub fn total_tasks(spec: &str) -> Option<usize> {
    parse_task_terms(spec)?
        .into_iter()
        .try_fold(0usize, |total, (count, repeat)| {
            count.checked_mul(repeat).and_then(|n| total.checked_add(n))
        })
}

/// Split at commas that are not inside brackets
fn split_top_level(list: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                groups.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&list[start..]);
    groups.into_iter().map(str::trim).filter(|g| !g.is_empty()).collect()
}

/// Expand one `prefix[set]suffix` group
fn expand_group(group: &str, out: &mut Vec<String>) {
    let (prefix, rest) = match group.split_once('[') {
        Some(parts) => parts,
        None => {
            out.push(group.to_string());
            return;
        }
    };
    let (set, suffix) = match rest.split_once(']') {
        Some(parts) => parts,
        None => {
            tracing::warn!("Unterminated host range in node list entry {:?}", group);
            out.push(group.to_string());
            return;
        }
    };

    let start_len = out.len();
    for item in set.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        match item.split_once('-') {
            Some((lo, hi)) => {
                let (Ok(first), Ok(last)) = (lo.parse::<u64>(), hi.parse::<u64>()) else {
                    tracing::warn!("Invalid host range {:?} in {:?}", item, group);
                    out.truncate(start_len);
                    out.push(group.to_string());
                    return;
                };
                let room = MAX_EXPANDED_HOSTS.saturating_sub(out.len()) as u64;
                if first <= last && last - first >= room {
                    tracing::warn!("Host range {:?} in {:?} is too large to expand", item, group);
                    out.truncate(start_len);
                    out.push(group.to_string());
                    return;
                }
                let width = lo.len();
                for i in first..=last {
                    out.push(format!("{}{:0width$}{}", prefix, i, suffix, width = width));
                }
            }
            None => out.push(format!("{}{}{}", prefix, item, suffix)),
        }
    }
}

/// Expand a compact SLURM node list such as `node[01-04,07],login1`
pub fn expand_slurm_nodelist(nodelist: &str) -> Vec<String> {
    let mut nodes = Vec::new();
    for group in split_top_level(nodelist) {
        expand_group(group, &mut nodes);
    }
    nodes
}

/// Expand a compact node list, repeating each host by its task count
///
/// `tasks_per_node` uses the `SLURM_TASKS_PER_NODE` syntax. Counts are
/// aligned positionally with the expanded nodes; a node without a matching
/// count entry is listed once. When the counts would exceed
/// [`MAX_EXPANDED_HOSTS`] entries each node is listed once.
pub fn expand_slurm_hosts(nodelist: &str, tasks_per_node: Option<&str>) -> Vec<String> {
    let nodes = expand_slurm_nodelist(nodelist);
    let counts = match tasks_per_node.and_then(|spec| parse_tasks_per_node(spec, nodes.len())) {
        Some(counts) if !counts.is_empty() => counts,
        _ => return nodes,
    };
    if counts.len() < nodes.len() {
        tracing::warn!(
            "SLURM node list has {} nodes but tasks per node lists {} entries",
            nodes.len(),
            counts.len()
        );
    }

    let total = (0..nodes.len()).try_fold(0usize, |total, i| {
        total.checked_add(counts.get(i).copied().unwrap_or(1))
    });
    let total = match total {
        Some(total) if total <= MAX_EXPANDED_HOSTS => total,
        _ => {
            tracing::warn!(
                "SLURM tasks per node exceed {} host entries, listing each node once",
                MAX_EXPANDED_HOSTS
            );
            return nodes;
        }
    };

    let mut hosts = Vec::with_capacity(total);
    for (i, node) in nodes.into_iter().enumerate() {
        let repeat = counts.get(i).copied().unwrap_or(1);
        hosts.extend(std::iter::repeat(node).take(repeat));
    }
    hosts
}

/// Parse `LSB_MCPU_HOSTS` ("host1 4 host2 4 ...") into (host, count) pairs
pub fn parse_lsf_mcpu_hosts(spec: &str) -> Option<Vec<(String, usize)>> {
    let tokens: Vec<&str> = spec.split_whitespace().collect();
    tokens
        .chunks(2)
        .map(|pair| match pair {
            [host, count] => count.parse().ok().map(|c| (host.to_string(), c)),
            _ => None,
        })
        .collect()
}

/// Process and node counts for a host list
///
/// The process count is the list length; nodes are counted as runs of
/// equal names in a sorted copy, so repeated hostnames count once no
/// matter where they appear in the original order.
pub fn n_procs_from_hosts_list<S: AsRef<str>>(hosts: &[S]) -> (usize, usize) {
    let mut sorted: Vec<&str> = hosts.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    let n_nodes = if sorted.is_empty() {
        0
    } else {
        1 + sorted.windows(2).filter(|w| w[0] != w[1]).count()
    };
    (sorted.len(), n_nodes)
}

/// Count entries in an existing host file
pub fn count_hosts_file_entries(path: &Path) -> Result<usize> {
    let content = fs::read_to_string(path).map_err(|e| LaunchError::io(path, e))?;
    Ok(content.lines().filter(|l| !l.trim().is_empty()).count())
}

/// Host file lines for a host list and an optional process count
///
/// Without a count the list is used verbatim. With a count, hosts are
/// taken cyclically in their original order until the count is reached.
pub fn hosts_file_entries<'a>(hosts: &'a [String], n_procs: Option<usize>) -> Vec<&'a str> {
    match n_procs {
        Some(n) if n > 0 && !hosts.is_empty() => {
            hosts.iter().cycle().take(n).map(String::as_str).collect()
        }
        _ => hosts.iter().map(String::as_str).collect(),
    }
}

/// Write a host file, one hostname per line
pub fn write_hosts_file(path: &Path, hosts: &[String], n_procs: Option<usize>) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| LaunchError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for host in hosts_file_entries(hosts, n_procs) {
        writeln!(writer, "{}", host).map_err(|e| LaunchError::io(path, e))?;
    }
    writer.flush().map_err(|e| LaunchError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tasks_per_node() {
        assert_eq!(parse_tasks_per_node("2(x3),1", 8), Some(vec![2, 2, 2, 1]));
        assert_eq!(parse_tasks_per_node("2(x3),1", 2), Some(vec![2, 2]));
        assert_eq!(total_tasks("2(x3),1"), Some(7));
        assert_eq!(total_tasks("16"), Some(16));
        assert_eq!(total_tasks("4(x2),2(x1)"), Some(10));
        assert_eq!(parse_tasks_per_node("2(3)", 8), None);
        assert_eq!(parse_tasks_per_node("two", 8), None);
    }

    #[test]
    fn test_total_tasks_overflow() {
        assert_eq!(total_tasks("18446744073709551615,1"), None);
        assert_eq!(total_tasks("2(x18446744073709551615)"), None);
        // Large repeats are summed without expanding them
        assert_eq!(total_tasks("3(x1000000000)"), Some(3_000_000_000));
    }

    #[test]
    fn test_huge_repeat_capped_at_nodes() {
        assert_eq!(parse_tasks_per_node("1(x1000000000)", 3), Some(vec![1, 1, 1]));
        let hosts = expand_slurm_hosts("node[1-2]", Some("2(x1000000000)"));
        assert_eq!(hosts, strings(&["node1", "node1", "node2", "node2"]));
    }

    #[test]
    fn test_oversized_counts_list_nodes_once() {
        let hosts = expand_slurm_hosts("node[1-2]", Some("18446744073709551615,1"));
        assert_eq!(hosts, strings(&["node1", "node2"]));
        let hosts = expand_slurm_hosts("node1", Some("100000000"));
        assert_eq!(hosts, strings(&["node1"]));
    }

    #[test]
    fn test_oversized_range_kept_verbatim() {
        assert_eq!(
            expand_slurm_nodelist("n[0-99999999999],login1"),
            strings(&["n[0-99999999999]", "login1"])
        );
    }

    #[test]
    fn test_expand_nodelist() {
        assert_eq!(
            expand_slurm_nodelist("node[01-04]"),
            strings(&["node01", "node02", "node03", "node04"])
        );
        assert_eq!(
            expand_slurm_nodelist("node1,node2,node3"),
            strings(&["node1", "node2", "node3"])
        );
        assert_eq!(
            expand_slurm_nodelist("node[1-3,5],node7"),
            strings(&["node1", "node2", "node3", "node5", "node7"])
        );
        assert_eq!(
            expand_slurm_nodelist("cn[008-010]-ib,gpu[2]"),
            strings(&["cn008-ib", "cn009-ib", "cn010-ib", "gpu2"])
        );
    }

    #[test]
    fn test_expand_nodelist_malformed() {
        assert_eq!(expand_slurm_nodelist("node[1-3"), strings(&["node[1-3"]));
        assert_eq!(expand_slurm_nodelist("node[a-c]"), strings(&["node[a-c]"]));
        assert!(expand_slurm_nodelist("").is_empty());
    }

    #[test]
    fn test_expand_hosts_with_counts() {
        let hosts = expand_slurm_hosts("node[1-3,5],node7", Some("2,1(x3),3"));
        assert_eq!(hosts.len(), 8);
        assert_eq!(hosts.iter().filter(|h| *h == "node7").count(), 3);
        assert_eq!(
            hosts,
            strings(&["node1", "node1", "node2", "node3", "node5", "node7", "node7", "node7"])
        );
    }

    #[test]
    fn test_expand_hosts_short_counts() {
        let hosts = expand_slurm_hosts("node[1-3]", Some("2"));
        assert_eq!(hosts, strings(&["node1", "node1", "node2", "node3"]));
        let hosts = expand_slurm_hosts("node[1-2]", None);
        assert_eq!(hosts, strings(&["node1", "node2"]));
    }

    #[test]
    fn test_lsf_mcpu_hosts() {
        assert_eq!(
            parse_lsf_mcpu_hosts("hostA 4 hostB 2"),
            Some(vec![("hostA".to_string(), 4), ("hostB".to_string(), 2)])
        );
        assert_eq!(parse_lsf_mcpu_hosts("hostA 4 hostB"), None);
        assert_eq!(parse_lsf_mcpu_hosts("hostA four"), None);
    }

    #[test]
    fn test_n_procs_from_hosts_list() {
        assert_eq!(n_procs_from_hosts_list(&["b", "a", "b", "c", "a"]), (5, 3));
        assert_eq!(n_procs_from_hosts_list(&["n1"]), (1, 1));
        assert_eq!(n_procs_from_hosts_list::<&str>(&[]), (0, 0));
    }

    #[test]
    fn test_hosts_file_cyclic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostsfile");
        let hosts = strings(&["h1", "h2", "h3"]);

        write_hosts_file(&path, &hosts, Some(5)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "h1\nh2\nh3\nh1\nh2\n");
        assert_eq!(count_hosts_file_entries(&path).unwrap(), 5);
    }

    #[test]
    fn test_hosts_file_entries() {
        let hosts = strings(&["h1", "h2", "h3"]);
        assert_eq!(hosts_file_entries(&hosts, None), vec!["h1", "h2", "h3"]);
        assert_eq!(hosts_file_entries(&hosts, Some(0)), vec!["h1", "h2", "h3"]);
        assert_eq!(hosts_file_entries(&hosts, Some(2)), vec!["h1", "h2"]);
        assert!(hosts_file_entries(&[], Some(4)).is_empty());
    }

    proptest! {
        #[test]
        fn prop_tasks_per_node_total(terms in prop::collection::vec((1usize..64, 1usize..8), 1..10)) {
            let spec = terms
                .iter()
                .map(|(c, r)| if *r == 1 { c.to_string() } else { format!("{}(x{})", c, r) })
                .collect::<Vec<_>>()
                .join(",");
            let expected: usize = terms.iter().map(|(c, r)| c * r).sum();
            prop_assert_eq!(total_tasks(&spec), Some(expected));
        }

        #[test]
        fn prop_range_expansion_len(lo in 0u64..500, len in 0u64..50) {
            let hi = lo + len;
            let nodes = expand_slurm_nodelist(&format!("n[{:03}-{:03}]", lo, hi));
            prop_assert_eq!(nodes.len() as u64, len + 1);
            prop_assert!(nodes.iter().all(|n| n.len() >= 4));
        }

        #[test]
        fn prop_node_count_bounded(hosts in prop::collection::vec("[a-d]", 1..40)) {
            let (n_procs, n_nodes) = n_procs_from_hosts_list(&hosts);
            prop_assert_eq!(n_procs, hosts.len());
            prop_assert!(n_nodes >= 1 && n_nodes <= 4);
        }
    }
}
