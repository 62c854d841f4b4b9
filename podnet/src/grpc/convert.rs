//! Conversions between the resource model and protobuf messages.

use super::proto;
use crate::model;

impl From<proto::Subnet> for model::Subnet {
    fn from(s: proto::Subnet) -> Self {
        Self {
            uid: s.uid,
            name: s.name,
            network_id: s.network_id,
            cidr: s.cidr,
            gateway: s.gateway,
            tenant_id: s.tenant_id,
            dns_nameservers: s.dns_nameservers,
        }
    }
}

impl From<model::Subnet> for proto::Subnet {
    fn from(s: model::Subnet) -> Self {
        Self {
            uid: s.uid,
            name: s.name,
            network_id: s.network_id,
            cidr: s.cidr,
            gateway: s.gateway,
            tenant_id: s.tenant_id,
            dns_nameservers: s.dns_nameservers,
        }
    }
}

impl From<proto::Network> for model::Network {
    fn from(n: proto::Network) -> Self {
        Self {
            uid: n.uid,
            name: n.name,
            tenant_id: n.tenant_id,
            subnets: n.subnets.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<model::Network> for proto::Network {
    fn from(n: model::Network) -> Self {
        Self {
            uid: n.uid,
            name: n.name,
            tenant_id: n.tenant_id,
            subnets: n.subnets.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<proto::FloatingIp> for model::FloatingIp {
    fn from(f: proto::FloatingIp) -> Self {
        Self {
            id: f.id,
            address: f.address,
            tenant_id: f.tenant_id,
            port_id: (!f.port_id.is_empty()).then_some(f.port_id),
            floating_network_id: f.floating_network_id,
        }
    }
}

impl From<model::FloatingIp> for proto::FloatingIp {
    fn from(f: model::FloatingIp) -> Self {
        Self {
            id: f.id,
            address: f.address,
            tenant_id: f.tenant_id,
            port_id: f.port_id.unwrap_or_default(),
            floating_network_id: f.floating_network_id,
        }
    }
}

impl From<proto::HostPort> for model::HostPort {
    fn from(h: proto::HostPort) -> Self {
        Self {
            name: h.name,
            ip_address: h.ip_address,
            port: h.port,
            target_port: h.target_port,
        }
    }
}

impl From<model::HostPort> for proto::HostPort {
    fn from(h: model::HostPort) -> Self {
        Self {
            name: h.name,
            ip_address: h.ip_address,
            port: h.port,
            target_port: h.target_port,
        }
    }
}

impl From<proto::LoadBalancer> for model::LoadBalancer {
    fn from(lb: proto::LoadBalancer) -> Self {
        Self {
            uid: lb.uid,
            name: lb.name,
            tenant_id: lb.tenant_id,
            hosts: lb.hosts.into_iter().map(Into::into).collect(),
            external_ips: lb.external_ips,
            vip: lb.vip,
        }
    }
}

impl From<model::LoadBalancer> for proto::LoadBalancer {
    fn from(lb: model::LoadBalancer) -> Self {
        Self {
            uid: lb.uid,
            name: lb.name,
            tenant_id: lb.tenant_id,
            hosts: lb.hosts.into_iter().map(Into::into).collect(),
            external_ips: lb.external_ips,
            vip: lb.vip,
        }
    }
}

impl From<proto::SessionAffinity> for model::SessionAffinity {
    fn from(a: proto::SessionAffinity) -> Self {
        match a {
            proto::SessionAffinity::None => model::SessionAffinity::None,
            proto::SessionAffinity::ClientIp => model::SessionAffinity::ClientIp,
        }
    }
}

impl From<model::SessionAffinity> for proto::SessionAffinity {
    fn from(a: model::SessionAffinity) -> Self {
        match a {
            model::SessionAffinity::None => proto::SessionAffinity::None,
            model::SessionAffinity::ClientIp => proto::SessionAffinity::ClientIp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floating_ip_empty_port_is_unbound() {
        let fip: model::FloatingIp = proto::FloatingIp {
            id: "fip-1".to_string(),
            address: "172.24.4.10".to_string(),
            ..Default::default()
        }
        .into();
        assert!(!fip.is_bound());

        let back: proto::FloatingIp = fip.into();
        assert_eq!(back.port_id, "");
    }

    #[test]
    fn test_network_keeps_subnet_order() {
        let network = model::Network {
            uid: "net-1".to_string(),
            name: "net1".to_string(),
            tenant_id: "t1".to_string(),
            subnets: vec![
                model::Subnet {
                    name: "b".to_string(),
                    cidr: "10.0.1.0/24".to_string(),
                    ..Default::default()
                },
                model::Subnet {
                    name: "a".to_string(),
                    cidr: "10.0.0.0/24".to_string(),
                    ..Default::default()
                },
            ],
        };

        let wire: proto::Network = network.clone().into();
        let names: Vec<&str> = wire.subnets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(model::Network::from(wire), network);
    }
}
