//! Selection of a zero-knowledge proof system for a document request.
use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::definitions::device_request::{DocRequest, RequestedClaim, ZkSystemSpec};

/// A zero-knowledge proof system available on the device.
pub trait ZkSystem: Send + Sync {
    /// Name the system is registered and requested under.
    fn name(&self) -> &str;

    /// Pick the spec this system can prove the requested claims with, if any.
    fn matching_system_spec(
        &self,
        specs: &[ZkSystemSpec],
        claims: &[RequestedClaim],
    ) -> Option<ZkSystemSpec>;
}

/// Proof systems available on the device, keyed by name.
#[derive(Clone, Default)]
pub struct ZkSystemRepository {
    systems: BTreeMap<String, Arc<dyn ZkSystem>>,
}

impl ZkSystemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system, replacing any system previously registered under the same name.
    pub fn add(&mut self, system: Arc<dyn ZkSystem>) -> &mut Self {
        self.systems.insert(system.name().to_string(), system);
        self
    }

    pub fn with_system(mut self, system: Arc<dyn ZkSystem>) -> Self {
        self.add(system);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn ZkSystem>> {
        self.systems.get(name).cloned()
    }
}

impl fmt::Debug for ZkSystemRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.systems.keys()).finish()
    }
}

/// The proof system chosen for a document request and the spec it will prove with.
#[derive(Clone)]
pub struct MatchedZkSystem {
    pub system: Arc<dyn ZkSystem>,
    pub spec: ZkSystemSpec,
}

impl PartialEq for MatchedZkSystem {
    fn eq(&self, other: &Self) -> bool {
        self.system.name() == other.system.name() && self.spec == other.spec
    }
}

impl fmt::Debug for MatchedZkSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchedZkSystem")
            .field("system", &self.system.name())
            .field("spec", &self.spec)
            .finish()
    }
}

/// Find the first proof system, in the reader's order of preference, that is available and
/// accepts the request.
pub fn find_matched_zk_system(
    doc_request: &DocRequest,
    repository: &ZkSystemRepository,
) -> Option<MatchedZkSystem> {
    let items_request = doc_request.items_request.as_ref();
    let specs = items_request.zk_request()?.system_specs;
    if specs.is_empty() {
        return None;
    }

    let claims = items_request.requested_claims();
    specs.iter().find_map(|requested| {
        let system = repository.lookup(&requested.system)?;
        let spec = system.matching_system_spec(&specs, &claims)?;
        Some(MatchedZkSystem { system, spec })
    })
}

#[cfg(test)]
pub(crate) mod test {
    use ciborium::Value;

    use super::*;
    use crate::{
        cbor,
        definitions::{
            device_request::{ItemsRequest, ZkRequest, ZK_REQUEST_KEY},
            helpers::{OrderedMap, Tag24},
        },
    };

    /// Accepts the first spec naming it, as long as no claim asks to be retained.
    pub(crate) struct StubZkSystem(pub &'static str);

    impl ZkSystem for StubZkSystem {
        fn name(&self) -> &str {
            self.0
        }

        fn matching_system_spec(
            &self,
            specs: &[ZkSystemSpec],
            claims: &[RequestedClaim],
        ) -> Option<ZkSystemSpec> {
            if claims.iter().any(|c| c.intent_to_retain) {
                return None;
            }
            specs.iter().find(|s| s.system == self.0).cloned()
        }
    }

    pub(crate) fn spec(id: &str, system: &str) -> ZkSystemSpec {
        ZkSystemSpec {
            id: id.to_string(),
            system: system.to_string(),
            params: BTreeMap::new(),
        }
    }

    fn doc_request(specs: Option<Vec<ZkSystemSpec>>, intent_to_retain: bool) -> DocRequest {
        let elements = OrderedMap::try_from(vec![("age_over_18".to_string(), intent_to_retain)])
            .unwrap();
        let request_info = specs.map(|system_specs| {
            let zk_request = ZkRequest {
                system_specs,
                zk_required: false,
            };
            BTreeMap::from([(
                ZK_REQUEST_KEY.to_string(),
                cbor::into_value(&zk_request).unwrap(),
            )])
        });
        DocRequest {
            items_request: Tag24::new(ItemsRequest {
                doc_type: "org.iso.18013.5.1.mDL".to_string(),
                namespaces: OrderedMap::try_from(vec![(
                    "org.iso.18013.5.1".to_string(),
                    elements,
                )])
                .unwrap(),
                request_info,
            })
            .unwrap(),
            reader_auth: None,
        }
    }

    fn repository(names: &[&'static str]) -> ZkSystemRepository {
        names.iter().fold(ZkSystemRepository::new(), |repo, name| {
            repo.with_system(Arc::new(StubZkSystem(*name)))
        })
    }

    #[test]
    fn first_available_system_in_request_order_wins() {
        let request = doc_request(Some(vec![spec("x-1", "X"), spec("y-1", "Y")]), false);

        let matched = find_matched_zk_system(&request, &repository(&["Y"])).unwrap();
        assert_eq!(matched.system.name(), "Y");
        assert_eq!(matched.spec, spec("y-1", "Y"));

        let matched = find_matched_zk_system(&request, &repository(&["X", "Y"])).unwrap();
        assert_eq!(matched.spec, spec("x-1", "X"));
    }

    #[test]
    fn no_specs_means_no_match() {
        let repo = repository(&["X"]);
        assert!(find_matched_zk_system(&doc_request(None, false), &repo).is_none());
        assert!(find_matched_zk_system(&doc_request(Some(vec![]), false), &repo).is_none());
    }

    #[test]
    fn system_declining_the_claims_means_no_match() {
        let request = doc_request(Some(vec![spec("x-1", "X")]), true);
        assert!(find_matched_zk_system(&request, &repository(&["X"])).is_none());
        assert!(find_matched_zk_system(&request, &repository(&[])).is_none());
    }

    #[test]
    fn malformed_zk_request_means_no_match() {
        let mut request = doc_request(None, false);
        let mut items_request = request.items_request.into_inner();
        items_request.request_info = Some(BTreeMap::from([(
            ZK_REQUEST_KEY.to_string(),
            Value::Array(vec![]),
        )]));
        request.items_request = Tag24::new(items_request).unwrap();
        assert!(find_matched_zk_system(&request, &repository(&["X"])).is_none());
    }
}
