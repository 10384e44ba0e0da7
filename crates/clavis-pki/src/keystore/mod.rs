//! 密钥库
//!
//! 按别名索引的三张独立映射：私钥、证书链、受信任证书。整个密钥库用一个
//! 主密码保存到单个加密容器文件中（格式见 [`container`]），每个私钥也用
//! 同一密码单独加密。
//!
//! 密钥库本身不加锁；多线程共享时由调用方串行化访问。

pub mod container;

use std::{
    collections::{BTreeSet, HashMap},
    fs,
    io::{ErrorKind, Write},
    path::Path,
};

use clavis_key::{CryptoConfig, PrivateKey};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use self::container::{Body, EntryRecord, KIND_PRIVATE_KEY, KIND_TRUSTED_CERTIFICATE};
use crate::{
    cert::Certificate,
    error::{PkiError, Result},
};

#[derive(Debug, Clone, Default)]
pub struct SecureKeyStore {
    private_keys: HashMap<String, PrivateKey>,
    certificate_chains: HashMap<String, Vec<Certificate>>,
    certificates: HashMap<String, Certificate>,
}

// ============================================================================
// 内存操作
// ============================================================================

impl SecureKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开已有的密钥库文件
    pub fn open<P: AsRef<Path>>(path: P, password: &str) -> Result<Self> {
        let mut store = Self::new();
        store.load(path, password)?;
        Ok(store)
    }

    /// 添加或覆盖受信任证书
    pub fn add_certificate(&mut self, alias: impl Into<String>, certificate: Certificate) {
        self.certificates.insert(alias.into(), certificate);
    }

    /// 添加或覆盖私钥；`chain` 为 None 时保留该别名已有的证书链
    pub fn add_private_key(
        &mut self,
        alias: impl Into<String>,
        private_key: PrivateKey,
        chain: Option<Vec<Certificate>>,
    ) {
        let alias = alias.into();
        if let Some(chain) = chain {
            self.certificate_chains.insert(alias.clone(), chain);
        }
        self.private_keys.insert(alias, private_key);
    }

    pub fn private_key(&self, alias: &str) -> Option<&PrivateKey> {
        self.private_keys.get(alias)
    }

    pub fn certificate(&self, alias: &str) -> Option<&Certificate> {
        self.certificates.get(alias)
    }

    pub fn certificate_chain(&self, alias: &str) -> Option<&[Certificate]> {
        self.certificate_chains.get(alias).map(Vec::as_slice)
    }

    /// 删除别名下的所有条目，返回是否存在过
    pub fn remove(&mut self, alias: &str) -> bool {
        let key = self.private_keys.remove(alias).is_some();
        let chain = self.certificate_chains.remove(alias).is_some();
        let cert = self.certificates.remove(alias).is_some();
        key || chain || cert
    }

    /// 所有别名，已排序
    pub fn aliases(&self) -> Vec<String> {
        self.private_keys
            .keys()
            .chain(self.certificate_chains.keys())
            .chain(self.certificates.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.aliases().len()
    }

    pub fn is_empty(&self) -> bool {
        self.private_keys.is_empty()
            && self.certificate_chains.is_empty()
            && self.certificates.is_empty()
    }
}

// ============================================================================
// 持久化
// ============================================================================

impl SecureKeyStore {
    /// 用默认配置保存
    pub fn store<P: AsRef<Path>>(&self, path: P, password: &str) -> Result<()> {
        self.store_with(path, password, &CryptoConfig::default())
    }

    /// 先写入同目录的临时文件再替换目标文件，失败时不会留下半个容器
    pub fn store_with<P: AsRef<Path>>(
        &self,
        path: P,
        password: &str,
        config: &CryptoConfig,
    ) -> Result<()> {
        let path = path.as_ref();
        config
            .validate()
            .map_err(|e| PkiError::persistence("Invalid keystore configuration", e))?;

        let body = self.to_body(password, config)?;
        let sealed = container::seal(&body, password, config.pbkdf2_iterations)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)
            .map_err(|e| PkiError::persistence(format!("Failed to create temp file in {}", dir.display()), e))?;
        file.write_all(&sealed)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| PkiError::persistence("Failed to write keystore", e))?;
        file.persist(path)
            .map_err(|e| PkiError::persistence(format!("Failed to replace {}", path.display()), e.error))?;

        info!(
            path = %path.display(),
            private_keys = self.private_keys.len(),
            certificates = self.certificates.len(),
            "stored keystore"
        );
        Ok(())
    }

    /// 读取并替换全部三张映射；任何错误都不会修改当前内容
    pub fn load<P: AsRef<Path>>(&mut self, path: P, password: &str) -> Result<()> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PkiError::NotFound(path.display().to_string()),
            _ => PkiError::persistence(format!("Failed to read {}", path.display()), e),
        })?;

        let body = container::open(&data, password).inspect_err(|e| {
            if e.is_decryption() {
                warn!(path = %path.display(), "keystore authentication failed");
            }
        })?;
        let loaded = Self::from_body(body, password)?;
        *self = loaded;

        info!(
            path = %path.display(),
            private_keys = self.private_keys.len(),
            certificates = self.certificates.len(),
            "loaded keystore"
        );
        Ok(())
    }

    /// 每张映射各写一条记录，同一别名可以同时有私钥条目和受信任证书条目
    fn to_body(&self, password: &str, config: &CryptoConfig) -> Result<Body> {
        let mut entries = Vec::with_capacity(self.private_keys.len() + self.certificates.len());

        let mut key_aliases: Vec<_> = self.private_keys.keys().collect();
        key_aliases.sort();
        for alias in key_aliases {
            let private_key = &self.private_keys[alias];
            let key_pem = private_key
                .to_encrypted_pem(password, config)
                .map_err(|e| PkiError::persistence(format!("Failed to protect key {alias:?}"), e))?;
            let chain = self
                .certificate_chains
                .get(alias)
                .map(|chain| chain.iter().map(Certificate::to_pem).collect::<Result<Vec<_>>>())
                .transpose()
                .map_err(|e| PkiError::persistence(format!("Failed to encode chain of {alias:?}"), e))?;
            entries.push(EntryRecord {
                alias: alias.clone(),
                kind: KIND_PRIVATE_KEY.to_string(),
                key: Some(key_pem),
                dn: private_key.dn().cloned(),
                chain,
                certificate: None,
            });
        }

        let mut cert_aliases: Vec<_> = self.certificates.keys().collect();
        cert_aliases.sort();
        for alias in cert_aliases {
            let pem = self.certificates[alias]
                .to_pem()
                .map_err(|e| PkiError::persistence(format!("Failed to encode {alias:?}"), e))?;
            entries.push(EntryRecord {
                alias: alias.clone(),
                kind: KIND_TRUSTED_CERTIFICATE.to_string(),
                key: None,
                dn: None,
                chain: None,
                certificate: Some(pem),
            });
        }

        Ok(Body { entries })
    }

    fn from_body(body: Body, password: &str) -> Result<Self> {
        let mut store = Self::new();
        for entry in body.entries {
            match entry.kind.as_str() {
                KIND_PRIVATE_KEY => {
                    let key_pem = entry.key.ok_or_else(|| {
                        PkiError::format_msg(format!("Key entry {:?} has no key", entry.alias))
                    })?;
                    let mut private_key = PrivateKey::from_pem_with_password(&key_pem, password)
                        .map_err(|e| match e {
                            clavis_key::Error::Decryption(_) => PkiError::decryption(
                                format!("Failed to decrypt key {:?}", entry.alias),
                                e,
                            ),
                            _ => PkiError::format(format!("Invalid key entry {:?}", entry.alias), e),
                        })?;
                    if let Some(dn) = entry.dn {
                        private_key.set_dn(dn);
                    }
                    let chain = entry
                        .chain
                        .map(|pems| {
                            pems.iter()
                                .map(|pem| Certificate::from_pem(pem))
                                .collect::<Result<Vec<_>>>()
                        })
                        .transpose()
                        .map_err(|e| {
                            PkiError::format(format!("Invalid chain for {:?}", entry.alias), e)
                        })?;
                    store.add_private_key(entry.alias, private_key, chain);
                }
                KIND_TRUSTED_CERTIFICATE => {
                    let pem = entry.certificate.ok_or_else(|| {
                        PkiError::format_msg(format!(
                            "Certificate entry {:?} has no certificate",
                            entry.alias
                        ))
                    })?;
                    let certificate = Certificate::from_pem(&pem).map_err(|e| {
                        PkiError::format(format!("Invalid certificate entry {:?}", entry.alias), e)
                    })?;
                    store.add_certificate(entry.alias, certificate);
                }
                other => {
                    warn!(alias = %entry.alias, kind = other, "unrecognized keystore entry");
                    return Err(PkiError::format_msg(format!(
                        "Entry {:?} has unrecognized kind {other:?}",
                        entry.alias
                    )));
                }
            }
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::OnceLock,
        time::{Duration, SystemTime},
    };

    use clavis_key::{DistinguishedName, KeyPair};

    use super::*;
    use crate::ca;

    struct Fixture {
        pair: KeyPair,
        cert: Certificate,
    }

    fn fixture() -> &'static Fixture {
        static FIXTURE: OnceLock<Fixture> = OnceLock::new();
        FIXTURE.get_or_init(|| {
            let pair = KeyPair::generate()
                .unwrap()
                .with_dn(DistinguishedName::new("keystore.test"));
            let now = SystemTime::now();
            let cert = ca::self_signed(&pair, now, now + Duration::from_secs(3600)).unwrap();
            Fixture { pair, cert }
        })
    }

    fn fast_config() -> CryptoConfig {
        CryptoConfig::default().with_pbkdf2_iterations(1_000)
    }

    #[test]
    fn test_missing_alias_is_none() {
        let store = SecureKeyStore::new();
        assert!(store.private_key("nope").is_none());
        assert!(store.certificate("nope").is_none());
        assert!(store.certificate_chain("nope").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_none_chain_keeps_existing_chain() {
        let f = fixture();
        let mut store = SecureKeyStore::new();
        store.add_private_key("me", f.pair.private_key().clone(), Some(vec![f.cert.clone()]));
        store.add_private_key("me", f.pair.private_key().clone(), None);
        assert_eq!(store.certificate_chain("me").unwrap().len(), 1);

        store.add_private_key("me", f.pair.private_key().clone(), Some(Vec::new()));
        assert!(store.certificate_chain("me").unwrap().is_empty());
        assert_eq!(store.aliases(), vec!["me".to_string()]);
    }

    #[test]
    fn test_aliases_are_sorted_union() {
        let f = fixture();
        let mut store = SecureKeyStore::new();
        store.add_certificate("zeta", f.cert.clone());
        store.add_private_key("alpha", f.pair.private_key().clone(), None);
        store.add_certificate("mid", f.cert.clone());
        assert_eq!(store.aliases(), vec!["alpha", "mid", "zeta"]);
        assert_eq!(store.len(), 3);

        assert!(store.remove("mid"));
        assert!(!store.remove("mid"));
        assert_eq!(store.aliases(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_same_alias_key_and_certificate_roundtrip() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.ks");

        let mut store = SecureKeyStore::new();
        store.add_private_key("x", f.pair.private_key().clone(), Some(vec![f.cert.clone()]));
        store.add_certificate("x", f.cert.clone());
        store.store_with(&path, "whatever", &fast_config()).unwrap();

        let loaded = SecureKeyStore::open(&path, "whatever").unwrap();
        assert_eq!(loaded.aliases(), vec!["x"]);
        assert!(loaded.private_key("x").unwrap().matches(f.pair.public_key()));
        assert_eq!(loaded.certificate_chain("x").unwrap(), &[f.cert.clone()]);
        assert_eq!(loaded.certificate("x").unwrap(), &f.cert);
    }

    #[test]
    fn test_tampered_iteration_count_is_format_error() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.ks");

        let mut store = SecureKeyStore::new();
        store.add_certificate("root", f.cert.clone());
        store.store_with(&path, "whatever", &fast_config()).unwrap();

        let mut data = fs::read(&path).unwrap();
        data[12..16].copy_from_slice(&u32::MAX.to_be_bytes());
        fs::write(&path, &data).unwrap();

        let err = SecureKeyStore::open(&path, "whatever").unwrap_err();
        assert!(matches!(err, PkiError::Format { .. }));
    }

    #[test]
    fn test_store_rejects_excessive_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.ks");
        let config = fast_config().with_pbkdf2_iterations(clavis_key::MAX_PBKDF2_ITERATIONS + 1);
        let err = SecureKeyStore::new().store_with(&path, "whatever", &config).unwrap_err();
        assert!(matches!(err, PkiError::Persistence { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_bad_entries_map_to_format_and_decryption() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.ks");
        let key_entry = |key: String| Body {
            entries: vec![EntryRecord {
                alias: "k".to_string(),
                kind: KIND_PRIVATE_KEY.to_string(),
                key: Some(key),
                dn: None,
                chain: None,
                certificate: None,
            }],
        };

        let garbage = clavis_key::key::encode_pem("ENCRYPTED PRIVATE KEY", b"not a key");
        fs::write(&path, container::seal(&key_entry(garbage), "whatever", 1_000).unwrap()).unwrap();
        let err = SecureKeyStore::open(&path, "whatever").unwrap_err();
        assert!(matches!(err, PkiError::Format { .. }), "{err:?}");

        // key protected under a different password than the container
        let foreign = f
            .pair
            .private_key()
            .to_encrypted_pem("something else", &fast_config())
            .unwrap();
        fs::write(&path, container::seal(&key_entry(foreign), "whatever", 1_000).unwrap()).unwrap();
        let err = SecureKeyStore::open(&path, "whatever").unwrap_err();
        assert!(matches!(err, PkiError::Decryption { .. }), "{err:?}");

        let bad_cert = Body {
            entries: vec![EntryRecord {
                alias: "c".to_string(),
                kind: KIND_TRUSTED_CERTIFICATE.to_string(),
                key: None,
                dn: None,
                chain: None,
                certificate: Some("not a certificate".to_string()),
            }],
        };
        fs::write(&path, container::seal(&bad_cert, "whatever", 1_000).unwrap()).unwrap();
        let err = SecureKeyStore::open(&path, "whatever").unwrap_err();
        assert!(matches!(err, PkiError::Format { .. }), "{err:?}");
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = SecureKeyStore::open(dir.path().join("absent.ks"), "whatever").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_kind_fails_whole_load() {
        let f = fixture();
        let body = Body {
            entries: vec![
                EntryRecord {
                    alias: "ok".to_string(),
                    kind: KIND_TRUSTED_CERTIFICATE.to_string(),
                    key: None,
                    dn: None,
                    chain: None,
                    certificate: Some(f.cert.to_pem().unwrap()),
                },
                EntryRecord {
                    alias: "odd".to_string(),
                    kind: "secret-key".to_string(),
                    key: None,
                    dn: None,
                    chain: None,
                    certificate: None,
                },
            ],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.ks");
        fs::write(&path, container::seal(&body, "whatever", 1_000).unwrap()).unwrap();

        let mut store = SecureKeyStore::new();
        store.add_certificate("before", f.cert.clone());
        let err = store.load(&path, "whatever").unwrap_err();
        assert!(matches!(err, PkiError::Format { .. }));
        // failed load leaves the previous contents alone
        assert_eq!(store.aliases(), vec!["before"]);
    }

    #[test]
    fn test_store_overwrites_existing_file() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twice.ks");

        let mut store = SecureKeyStore::new();
        store.add_certificate("one", f.cert.clone());
        store.store_with(&path, "whatever", &fast_config()).unwrap();
        store.add_certificate("two", f.cert.clone());
        store.store_with(&path, "whatever", &fast_config()).unwrap();

        let loaded = SecureKeyStore::open(&path, "whatever").unwrap();
        assert_eq!(loaded.aliases(), vec!["one", "two"]);
        // only the target file remains, no temp files
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_loaded_key_keeps_dn() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dn.ks");

        let mut store = SecureKeyStore::new();
        store.add_private_key("ca", f.pair.private_key().clone(), Some(vec![f.cert.clone()]));
        store.store_with(&path, "whatever", &fast_config()).unwrap();

        let loaded = SecureKeyStore::open(&path, "whatever").unwrap();
        let key = loaded.private_key("ca").unwrap();
        assert_eq!(key.dn(), f.pair.dn());
        assert!(key.matches(f.pair.public_key()));
    }
}
