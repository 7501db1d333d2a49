//! Filesystem materialiser.
//!
//! Turns one `f` response into a navigable tree: authenticate and install
//! share keys, unwrap per-node keys, decrypt attributes, resolve names and
//! paths, index children. Nodes that fail any gate are dropped with a
//! warning; a single bad entry never aborts the load.
//!
//! The graph is a DAG, not a tree: a node can hang under a parent and under
//! the sharer that granted it (`su`). Path resolution walks parent first,
//! sharer second, and caps the walk at the node count so a corrupt parent
//! loop cannot spin forever.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use mega_crypto::aes::{aes_dec, aes_dec_block};
use mega_crypto::b64::ub64dec;
use mega_crypto::rsa::RsaPrivate;
use mega_proto::api::{FilesResponse, NodeEntry, ShareKeyEntry};
use mega_proto::attrs::dec_node_attrs;
use mega_proto::handshake::unwrap_node_key;

/// Synthetic root of roots.
pub const TOP_HANDLE: &str = "*TOP*";
/// Synthetic container for contact pseudo-nodes.
pub const NETWORK_HANDLE: &str = "*NETWORK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Folder,
    Root,
    Inbox,
    Rubbish,
    Contact,
    Network,
    Top,
}

impl NodeKind {
    /// Map a wire `t` value. Synthetic kinds never appear on the wire.
    pub fn from_wire(t: i64) -> Option<Self> {
        match t {
            0 => Some(NodeKind::File),
            1 => Some(NodeKind::Folder),
            2 => Some(NodeKind::Root),
            3 => Some(NodeKind::Inbox),
            4 => Some(NodeKind::Rubbish),
            8 => Some(NodeKind::Contact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub handle: String,
    pub parent_handle: Option<String>,
    /// Share-origin owner; may coexist with `parent_handle`.
    #[serde(default)]
    pub su_handle: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    pub kind: NodeKind,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mtime: Option<i64>,
    /// 16-byte attribute key (folded for files).
    #[serde(default)]
    pub key: Option<[u8; 16]>,
    /// 32-byte packed key, files only.
    #[serde(default)]
    pub key_full: Option<[u8; 32]>,
    #[serde(default)]
    pub attrs: Option<Map<String, Value>>,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileSystem {
    pub nodes: HashMap<String, Node>,
    pub share_keys: HashMap<String, [u8; 16]>,
    /// Unique path → handle.
    pub path_map: HashMap<String, String>,
    /// Parent handle → child handles, in catalogue order.
    pub children: HashMap<String, Vec<String>>,
}

impl FileSystem {
    /// Materialise one `f` response.
    ///
    /// `exported` marks an exported-folder session: the first catalogue node
    /// becomes the root (parent forced to the top) and `mk` doubles as that
    /// folder's share key.
    pub fn build(
        resp: &FilesResponse,
        own_handle: &str,
        mk: &[u8; 16],
        privk: Option<&RsaPrivate>,
        exported: bool,
    ) -> FileSystem {
        let mut fs = FileSystem::default();
        let mut order: Vec<String> = Vec::new();

        fs.add_node(
            &mut order,
            Node {
                handle: TOP_HANDLE.to_string(),
                parent_handle: None,
                su_handle: None,
                user: None,
                kind: NodeKind::Top,
                size: None,
                mtime: None,
                key: None,
                key_full: None,
                attrs: None,
                name: String::new(),
                path: String::new(),
            },
        );
        fs.add_node(
            &mut order,
            Node {
                handle: NETWORK_HANDLE.to_string(),
                parent_handle: Some(TOP_HANDLE.to_string()),
                su_handle: None,
                user: None,
                kind: NodeKind::Network,
                size: None,
                mtime: None,
                key: None,
                key_full: None,
                attrs: None,
                name: "Contacts".to_string(),
                path: String::new(),
            },
        );

        if exported {
            if let Some(first) = resp.f.first() {
                fs.share_keys.insert(first.h.clone(), *mk);
            }
        }

        for entry in &resp.ok {
            fs.install_wrapped_share_key(entry, mk);
        }

        for (index, entry) in resp.f.iter().enumerate() {
            fs.import_node(
                &mut order,
                entry,
                own_handle,
                mk,
                privk,
                exported && index == 0,
            );
        }

        // Contact pseudo-nodes come last, one per accepted relationship.
        for rel in &resp.u {
            if rel.c != Some(1) {
                continue;
            }
            if fs.nodes.contains_key(&rel.u) {
                warn!(handle = %rel.u, "contact handle collides with a node, skipping");
                continue;
            }
            fs.add_node(
                &mut order,
                Node {
                    handle: rel.u.clone(),
                    parent_handle: Some(NETWORK_HANDLE.to_string()),
                    su_handle: None,
                    user: Some(rel.u.clone()),
                    kind: NodeKind::Contact,
                    size: None,
                    mtime: None,
                    key: None,
                    key_full: None,
                    attrs: None,
                    name: rel.m.clone().unwrap_or_else(|| rel.u.clone()),
                    path: String::new(),
                },
            );
        }

        fs.compute_paths(&order);
        fs.index_children(&order);
        debug!(
            nodes = fs.nodes.len(),
            shares = fs.share_keys.len(),
            "filesystem materialised"
        );
        fs
    }

    fn add_node(&mut self, order: &mut Vec<String>, node: Node) {
        let handle = node.handle.clone();
        if self.nodes.insert(handle.clone(), node).is_none() {
            order.push(handle);
        } else {
            warn!(handle = %handle, "duplicate node handle, keeping the later entry");
        }
    }

    /// Install one owner-wrapped share key, gated on its authenticator:
    /// AES-ECB decryption of `ha` under the master key must equal the
    /// handle doubled.
    fn install_wrapped_share_key(&mut self, entry: &ShareKeyEntry, mk: &[u8; 16]) {
        let authentic = ub64dec(&entry.ha)
            .ok()
            .and_then(|ha| aes_dec(mk, &ha).ok())
            .map(|plain| {
                let doubled = [entry.h.as_bytes(), entry.h.as_bytes()].concat();
                plain == doubled
            })
            .unwrap_or(false);
        if !authentic {
            warn!(handle = %entry.h, "share key failed authentication, dropping");
            return;
        }

        let Some(plain) = ub64dec(&entry.k).ok().and_then(|k| aes_dec(mk, &k).ok()) else {
            warn!(handle = %entry.h, "share key unwrap failed, dropping");
            return;
        };
        if plain.len() < 16 {
            warn!(handle = %entry.h, "share key too short, dropping");
            return;
        }
        let key: [u8; 16] = plain[..16].try_into().expect("length checked");
        self.share_keys.insert(entry.h.clone(), key);
    }

    fn import_node(
        &mut self,
        order: &mut Vec<String>,
        entry: &NodeEntry,
        own_handle: &str,
        mk: &[u8; 16],
        privk: Option<&RsaPrivate>,
        forced_root: bool,
    ) {
        let Some(kind) = NodeKind::from_wire(entry.t) else {
            warn!(handle = %entry.h, t = entry.t, "unknown node type, dropping");
            return;
        };

        let (name, key, key_full, attrs) = match kind {
            NodeKind::Root => ("Root".to_string(), None, None, None),
            NodeKind::Inbox => ("Inbox".to_string(), None, None, None),
            NodeKind::Rubbish => ("Rubbish".to_string(), None, None, None),
            NodeKind::File | NodeKind::Folder => {
                let Some(k_field) = entry.k.as_deref() else {
                    warn!(handle = %entry.h, "node carries no key, dropping");
                    return;
                };
                let Some(node_key) = unwrap_node_key(k_field, own_handle, mk, &self.share_keys)
                else {
                    warn!(handle = %entry.h, "no usable key for node, dropping");
                    return;
                };
                let Some(blob) = entry.a.as_deref() else {
                    warn!(handle = %entry.h, "node carries no attributes, dropping");
                    return;
                };
                let Some(map) = dec_node_attrs(node_key.attr_key(), blob) else {
                    warn!(handle = %entry.h, "attribute decryption failed, dropping");
                    return;
                };
                let Some(node_name) = map.get("n").and_then(Value::as_str) else {
                    warn!(handle = %entry.h, "attributes carry no name, dropping");
                    return;
                };
                if !name_is_safe(node_name) {
                    warn!(handle = %entry.h, name = node_name, "unsafe node name, dropping");
                    return;
                }
                let name = node_name.to_string();
                let key = Some(*node_key.attr_key());
                let key_full = node_key.full_key().copied();
                (name, key, key_full, Some(map))
            }
            NodeKind::Contact | NodeKind::Network | NodeKind::Top => {
                warn!(handle = %entry.h, "pseudo-node type in catalogue, dropping");
                return;
            }
        };

        if let Some(sk) = entry.sk.as_deref() {
            self.install_node_share_key(&entry.h, sk, mk, privk);
        }

        let parent_handle = if forced_root {
            Some(TOP_HANDLE.to_string())
        } else {
            entry
                .p
                .clone()
                .or_else(|| Some(TOP_HANDLE.to_string()))
        };

        self.add_node(
            order,
            Node {
                handle: entry.h.clone(),
                parent_handle,
                su_handle: entry.su.clone(),
                user: entry.u.clone(),
                kind,
                size: entry.s,
                mtime: entry.ts,
                key,
                key_full,
                attrs,
                name,
                path: String::new(),
            },
        );
    }

    /// Install a node's own share key. The ciphertext is decoded first and
    /// the wrapping dispatched on its length: exactly 16 bytes is AES-ECB
    /// under the master key, longer is RSA under our private key.
    fn install_node_share_key(
        &mut self,
        handle: &str,
        sk_b64: &str,
        mk: &[u8; 16],
        privk: Option<&RsaPrivate>,
    ) {
        let Ok(esk) = ub64dec(sk_b64) else {
            warn!(handle, "share key is not base64, dropping");
            return;
        };
        let plain = if esk.len() == 16 {
            let block: [u8; 16] = esk.as_slice().try_into().expect("length checked");
            aes_dec_block(mk, &block).to_vec()
        } else if esk.len() > 16 {
            let Some(privk) = privk else {
                warn!(handle, "RSA share key but no private key, dropping");
                return;
            };
            match privk.decrypt(&esk) {
                Ok(plain) => plain,
                Err(e) => {
                    warn!(handle, "RSA share key decryption failed: {e}");
                    return;
                }
            }
        } else {
            warn!(handle, len = esk.len(), "share key too short, dropping");
            return;
        };
        if plain.len() < 16 {
            warn!(handle, "decrypted share key too short, dropping");
            return;
        }
        let key: [u8; 16] = plain[..16].try_into().expect("length checked");
        self.share_keys.insert(handle.to_string(), key);
    }

    fn compute_paths(&mut self, order: &[String]) {
        let mut resolved: Vec<(String, String)> = Vec::new();
        for handle in order {
            if handle == TOP_HANDLE {
                continue;
            }
            match self.resolve_path(handle) {
                Some(path) if !path.is_empty() => resolved.push((handle.clone(), path)),
                _ => {}
            }
        }
        for (handle, mut path) in resolved {
            if self.path_map.contains_key(&path) {
                debug!(handle = %handle, path = %path, "path collision, suffixing handle");
                path = format!("{path}.{handle}");
            }
            if let Some(node) = self.nodes.get_mut(&handle) {
                node.path = path.clone();
            }
            self.path_map.insert(path, handle);
        }
    }

    /// Walk to the top collecting names. The walk is capped at the node
    /// count; exceeding it means a parent loop, in which case the node gets
    /// no path.
    fn resolve_path(&self, handle: &str) -> Option<String> {
        let cap = self.nodes.len();
        let mut parts: Vec<&str> = Vec::new();
        let mut current = handle;
        let mut depth = 0usize;
        loop {
            let node = self.nodes.get(current)?;
            if node.handle == TOP_HANDLE {
                break;
            }
            if !node.name.is_empty() {
                parts.push(&node.name);
            }
            let next = node
                .parent_handle
                .as_deref()
                .or(node.su_handle.as_deref());
            match next {
                Some(p) if self.nodes.contains_key(p) => current = p,
                _ => break,
            }
            depth += 1;
            if depth > cap {
                warn!(handle, "ancestry walk exceeded node count, dropping path");
                return None;
            }
        }
        parts.reverse();
        Some(parts.join("/"))
    }

    /// A node is indexed under its parent and, when shared, under the
    /// sharer as well.
    fn index_children(&mut self, order: &[String]) {
        for handle in order {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            let parent = node.parent_handle.clone();
            let su = node.su_handle.clone();
            if let Some(p) = &parent {
                self.children
                    .entry(p.clone())
                    .or_default()
                    .push(handle.clone());
            }
            if let Some(su) = su {
                if parent.as_deref() != Some(su.as_str()) {
                    self.children.entry(su).or_default().push(handle.clone());
                }
            }
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn node(&self, handle: &str) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn node_by_path(&self, path: &str) -> Option<&Node> {
        self.path_map.get(path).and_then(|h| self.nodes.get(h))
    }

    pub fn children_of(&self, handle: &str) -> Vec<&Node> {
        self.children
            .get(handle)
            .map(|handles| handles.iter().filter_map(|h| self.nodes.get(h)).collect())
            .unwrap_or_default()
    }
}

/// Reject names that cannot become a path component. The separator set is
/// platform-specific: Windows forbids its full reserved set, elsewhere only
/// the forward slash matters.
fn name_is_safe(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if cfg!(windows) {
        !name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*'))
    } else {
        !name.contains('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mega_crypto::aes::aes_enc;
    use mega_crypto::b64::ub64enc;
    use mega_crypto::buf::{random_key, unpack_file_key};
    use mega_proto::api::UserRelation;
    use mega_proto::attrs::make_node_attrs;

    const MK: [u8; 16] = [0x60; 16];
    const UH: &str = "me00000000a";

    fn wrap(key: &[u8; 16], plain: &[u8]) -> String {
        ub64enc(&aes_enc(key, plain).unwrap())
    }

    fn attr_blob(key: &[u8; 16], name: &str) -> String {
        let mut map = Map::new();
        map.insert("n".into(), Value::String(name.into()));
        make_node_attrs(key, &map).unwrap()
    }

    fn entry(h: &str, t: i64) -> NodeEntry {
        NodeEntry {
            h: h.to_string(),
            t,
            p: None,
            u: None,
            a: None,
            k: None,
            s: None,
            ts: None,
            su: None,
            sk: None,
        }
    }

    fn root_entry(h: &str) -> NodeEntry {
        entry(h, 2)
    }

    fn folder_entry(h: &str, parent: &str, key: &[u8; 16], name: &str) -> NodeEntry {
        NodeEntry {
            p: Some(parent.to_string()),
            a: Some(attr_blob(key, name)),
            k: Some(format!("{UH}:{}", wrap(&MK, key))),
            ..entry(h, 1)
        }
    }

    fn file_entry(h: &str, parent: &str, full: &[u8; 32], name: &str) -> NodeEntry {
        let folded = unpack_file_key(full);
        NodeEntry {
            p: Some(parent.to_string()),
            a: Some(attr_blob(&folded, name)),
            k: Some(format!("{UH}:{}", wrap(&MK, full))),
            s: Some(1024),
            ..entry(h, 0)
        }
    }

    fn build(f: Vec<NodeEntry>, ok: Vec<ShareKeyEntry>, u: Vec<UserRelation>) -> FileSystem {
        let resp = FilesResponse { ok, f, u };
        FileSystem::build(&resp, UH, &MK, None, false)
    }

    #[test]
    fn share_key_and_file_node_import() {
        // One owner-wrapped share and one file under the root.
        let share_handle = "share0ab";
        let share_key = random_key();
        let ha = wrap(&MK, &[share_handle.as_bytes(), share_handle.as_bytes()].concat());
        let ok = ShareKeyEntry {
            h: share_handle.to_string(),
            ha,
            k: wrap(&MK, &share_key),
        };

        let full = {
            let mut k = [0u8; 32];
            k[..16].copy_from_slice(&random_key());
            k[16..].copy_from_slice(&random_key());
            k
        };
        let fs = build(
            vec![
                root_entry("root0000abc"),
                file_entry("file0000abc", "root0000abc", &full, "hello.txt"),
            ],
            vec![ok],
            vec![],
        );

        assert_eq!(fs.share_keys.get(share_handle), Some(&share_key));

        let node = fs.node("file0000abc").unwrap();
        assert_eq!(node.kind, NodeKind::File);
        assert_eq!(node.key_full, Some(full));
        assert_eq!(node.key, Some(unpack_file_key(&full)));
        assert_eq!(node.name, "hello.txt");
        assert_eq!(node.path, "Root/hello.txt");
        assert_eq!(fs.node_by_path("Root/hello.txt").unwrap().handle, node.handle);

        let children: Vec<&str> = fs
            .children_of("root0000abc")
            .iter()
            .map(|n| n.handle.as_str())
            .collect();
        assert_eq!(children, vec!["file0000abc"]);
    }

    #[test]
    fn unauthenticated_share_key_is_dropped_without_aborting() {
        let good_handle = "good0ab1";
        let good_key = random_key();
        let good = ShareKeyEntry {
            h: good_handle.to_string(),
            ha: wrap(&MK, &[good_handle.as_bytes(), good_handle.as_bytes()].concat()),
            k: wrap(&MK, &good_key),
        };
        let bad = ShareKeyEntry {
            h: "badshare00a".to_string(),
            ha: ub64enc(&[0u8; 16]),
            k: wrap(&MK, &random_key()),
        };

        let fs = build(vec![root_entry("root0000abc")], vec![bad, good], vec![]);
        assert_eq!(fs.share_keys.len(), 1);
        assert_eq!(fs.share_keys.get(good_handle), Some(&good_key));
    }

    #[test]
    fn admitted_nodes_never_exceed_catalogue() {
        let key = random_key();
        let fs = build(
            vec![
                root_entry("root0000abc"),
                folder_entry("keep0000abc", "root0000abc", &key, "docs"),
                // Unknown owner: no usable key.
                NodeEntry {
                    p: Some("root0000abc".to_string()),
                    a: Some(attr_blob(&key, "ghost")),
                    k: Some(format!("stranger0ab:{}", wrap(&MK, &key))),
                    ..entry("drop0000abc", 1)
                },
            ],
            vec![],
            vec![],
        );
        // Two virtual nodes plus the admitted subset.
        let admitted = fs.nodes.len() - 2;
        assert_eq!(admitted, 2);
        assert!(fs.node("drop0000abc").is_none());
    }

    #[test]
    fn attribute_blob_without_magic_is_dropped() {
        let key = random_key();
        let node = NodeEntry {
            a: Some(ub64enc(&aes_enc(&key, &[0x55u8; 32]).unwrap())),
            k: Some(format!("{UH}:{}", wrap(&MK, &key))),
            p: Some("root0000abc".to_string()),
            ..entry("file0000abc", 0)
        };
        let fs = build(vec![root_entry("root0000abc"), node], vec![], vec![]);
        assert!(fs.node("file0000abc").is_none());
    }

    #[test]
    fn unsafe_names_are_rejected() {
        let key = random_key();
        let mut entries = vec![root_entry("root0000abc")];
        for (i, name) in [".", "..", "a/b"].iter().enumerate() {
            let h = format!("bad0000000{i}");
            entries.push(folder_entry(&h, "root0000abc", &key, name));
        }
        entries.push(folder_entry("good0000abc", "root0000abc", &key, "fine"));

        let fs = build(entries, vec![], vec![]);
        assert!(fs.node("bad00000000").is_none());
        assert!(fs.node("bad00000001").is_none());
        assert!(fs.node("bad00000002").is_none());
        assert_eq!(fs.node("good0000abc").unwrap().path, "Root/fine");
    }

    #[test]
    fn path_collisions_suffix_the_later_node() {
        let key = random_key();
        let fs = build(
            vec![
                root_entry("root0000abc"),
                folder_entry("first000abc", "root0000abc", &key, "same"),
                folder_entry("second00abc", "root0000abc", &key, "same"),
            ],
            vec![],
            vec![],
        );
        assert_eq!(fs.node("first000abc").unwrap().path, "Root/same");
        assert_eq!(
            fs.node("second00abc").unwrap().path,
            "Root/same.second00abc"
        );
        // Injective after suffixing.
        assert_eq!(fs.path_map.len(), fs.path_map.values().collect::<std::collections::HashSet<_>>().len());
    }

    #[test]
    fn parent_cycles_do_not_hang_or_panic() {
        let key = random_key();
        let fs = build(
            vec![
                folder_entry("looper00abc", "looped00abc", &key, "a"),
                folder_entry("looped00abc", "looper00abc", &key, "b"),
            ],
            vec![],
            vec![],
        );
        // Both nodes admitted, neither gets a path.
        assert!(fs.node("looper00abc").unwrap().path.is_empty());
        assert!(fs.node("looped00abc").unwrap().path.is_empty());
    }

    #[test]
    fn shared_node_is_indexed_under_parent_and_sharer() {
        let key = random_key();
        let sharer = "sharer000ab";
        let mut node = folder_entry("shared000ab", "root0000abc", &key, "incoming");
        node.su = Some(sharer.to_string());
        let fs = build(vec![root_entry("root0000abc"), node], vec![], vec![]);

        let under_parent: Vec<&str> = fs
            .children_of("root0000abc")
            .iter()
            .map(|n| n.handle.as_str())
            .collect();
        let under_sharer: Vec<&str> = fs
            .children_of(sharer)
            .iter()
            .map(|n| n.handle.as_str())
            .collect();
        assert_eq!(under_parent, vec!["shared000ab"]);
        assert_eq!(under_sharer, vec!["shared000ab"]);
    }

    #[test]
    fn node_share_key_installs_from_aes_form() {
        let key = random_key();
        let share = random_key();
        let mut node = folder_entry("folder000ab", "root0000abc", &key, "shared");
        node.sk = Some(wrap(&MK, &share));
        let fs = build(vec![root_entry("root0000abc"), node], vec![], vec![]);
        assert_eq!(fs.share_keys.get("folder000ab"), Some(&share));
    }

    #[test]
    fn contacts_hang_under_the_network_node() {
        let fs = build(
            vec![root_entry("root0000abc")],
            vec![],
            vec![
                UserRelation {
                    u: "friend0000a".to_string(),
                    m: Some("alice@x".to_string()),
                    c: Some(1),
                },
                UserRelation {
                    u: "pending000a".to_string(),
                    m: Some("bob@x".to_string()),
                    c: Some(0),
                },
            ],
        );
        let contact = fs.node("friend0000a").unwrap();
        assert_eq!(contact.kind, NodeKind::Contact);
        assert_eq!(contact.path, "Contacts/alice@x");
        assert!(fs.node("pending000a").is_none());

        let network_children: Vec<&str> = fs
            .children_of(NETWORK_HANDLE)
            .iter()
            .map(|n| n.handle.as_str())
            .collect();
        assert_eq!(network_children, vec!["friend0000a"]);
    }

    #[test]
    fn exported_folder_forces_first_node_to_root() {
        let folder_key = random_key();
        let mk = random_key(); // the exported folder's master key
        let root = NodeEntry {
            p: Some("elsewhere0a".to_string()), // must be overridden
            a: Some(attr_blob(&folder_key, "Public")),
            k: Some(format!("export000ab:{}", wrap(&mk, &folder_key))),
            ..entry("export000ab", 1)
        };
        let child = NodeEntry {
            p: Some("export000ab".to_string()),
            a: Some(attr_blob(&folder_key, "inner")),
            k: Some(format!("export000ab:{}", wrap(&mk, &folder_key))),
            ..entry("inner0000ab", 1)
        };
        let resp = FilesResponse {
            ok: vec![],
            f: vec![root, child],
            u: vec![],
        };
        let fs = FileSystem::build(&resp, "", &mk, None, true);

        let root = fs.node("export000ab").unwrap();
        assert_eq!(root.parent_handle.as_deref(), Some(TOP_HANDLE));
        assert_eq!(root.path, "Public");
        assert_eq!(fs.node("inner0000ab").unwrap().path, "Public/inner");
        assert_eq!(fs.share_keys.get("export000ab"), Some(&mk));
    }

    #[test]
    fn fixed_root_names_and_default_parents() {
        let fs = build(
            vec![
                root_entry("root0000abc"),
                entry("inbox000abc", 3),
                entry("trash000abc", 4),
            ],
            vec![],
            vec![],
        );
        assert_eq!(fs.node("root0000abc").unwrap().name, "Root");
        assert_eq!(fs.node("inbox000abc").unwrap().name, "Inbox");
        assert_eq!(fs.node("trash000abc").unwrap().name, "Rubbish");
        for h in ["root0000abc", "inbox000abc", "trash000abc"] {
            assert_eq!(
                fs.node(h).unwrap().parent_handle.as_deref(),
                Some(TOP_HANDLE)
            );
        }
        assert_eq!(fs.node_by_path("Rubbish").unwrap().handle, "trash000abc");
    }

    #[test]
    fn snapshot_roundtrips_through_serde() {
        let key = random_key();
        let fs = build(
            vec![
                root_entry("root0000abc"),
                folder_entry("folder000ab", "root0000abc", &key, "docs"),
            ],
            vec![],
            vec![],
        );
        let bytes = serde_json::to_vec(&fs).unwrap();
        let restored: FileSystem = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(restored.nodes.len(), fs.nodes.len());
        assert_eq!(
            restored.node("folder000ab").unwrap().path,
            fs.node("folder000ab").unwrap().path
        );
        assert_eq!(restored.path_map, fs.path_map);
    }

    #[test]
    fn name_safety_matrix() {
        assert!(name_is_safe("report.pdf"));
        assert!(name_is_safe("..hidden"));
        assert!(!name_is_safe("."));
        assert!(!name_is_safe(".."));
        assert!(!name_is_safe(""));
        assert!(!name_is_safe("a/b"));
        if cfg!(windows) {
            assert!(!name_is_safe("a\\b"));
            assert!(!name_is_safe("a:b"));
            assert!(!name_is_safe("a*b"));
        }
    }
}
