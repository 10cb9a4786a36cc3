//! Built-in threat rule catalog
//!
//! A starter set of CAPEC-derived rules. The catalog is data: the engine
//! only guarantees correct, deterministic application of whatever rules are
//! registered, not completeness of this list.

use crate::component::{DataFormat, Technology};
use crate::threat::{Category, ComponentThreat, Incident, Threat, ThreatLibrary, ThreatMeta};
use crate::risk::{Impact, Likelihood};

/// Build a library holding the full built-in catalog
#[must_use]
pub fn default_library() -> ThreatLibrary {
    let mut library = ThreatLibrary::new();
    library.add_threats([
        capec_17(),
        capec_62(),
        capec_63(),
        capec_66(),
        capec_126(),
        capec_136(),
        capec_250(),
        capec_664(),
        capec_676(),
    ]);
    library
}

/// CAPEC-17: Using Malicious Files
#[must_use]
pub fn capec_17() -> Threat {
    let meta = ThreatMeta::new("CAPEC-17", "Using Malicious Files", Category::SubvertAccessControl)
        .description(
            "An attack of this type exploits a system's configuration that allows an adversary \
             to either directly access an executable file, or in a possible worst case allows an \
             adversary to upload a file and then execute it. Web servers, ftp servers, and \
             message oriented middleware systems which have many integration points are \
             particularly vulnerable.",
        )
        .prerequisites([
            "System's configuration must allow an attacker to directly access executable files \
             or upload files to execute.",
        ])
        .risk_text("Using Malicious Files risk at {component}.")
        .cwe_ids([732, 285, 272, 59, 282, 270, 693])
        .reference("https://capec.mitre.org/data/definitions/17.html")
        .rated(Impact::High, Likelihood::Likely);

    Threat::Component(ComponentThreat::new(meta, |model, c| {
        let component = model.component(c);
        if component.accepts_data_formats.contains(&DataFormat::File) {
            Ok(vec![Incident::component()])
        } else {
            Ok(Vec::new())
        }
    }))
}

/// CAPEC-62: Cross-Site Request Forgery, once per incoming web-access flow
#[must_use]
pub fn capec_62() -> Threat {
    let meta = ThreatMeta::new(
        "CAPEC-62",
        "Cross-Site Request Forgery (CSRF)",
        Category::SubvertAccessControl,
    )
    .description(
        "An attacker crafts malicious web links and distributes them, hoping to induce users to \
         click on the link and execute the malicious action against some third-party \
         application with the users' privilege level. This type of attack leverages the \
         persistence and implicit trust placed in user session cookies by many web applications.",
    )
    .risk_text("Cross-Site Request Forgery (CSRF) risk at {component} via {data_flow} from {data_flow.source}")
    .cwe_ids([352, 306, 664, 732, 1275])
    .reference("https://capec.mitre.org/data/definitions/62.html")
    .rated(Impact::Medium, Likelihood::VeryLikely);

    Threat::Component(ComponentThreat::new(meta, |model, c| {
        if !model.component(c).is_web_application() {
            return Ok(Vec::new());
        }
        Ok(model
            .incoming_flows(c)
            .into_iter()
            .filter(|&f| model.data_flow(f).protocol.is_web_access())
            .map(Incident::via)
            .collect())
    }))
}

/// CAPEC-63: Cross-Site Scripting
#[must_use]
pub fn capec_63() -> Threat {
    let meta = ThreatMeta::new(
        "CAPEC-63",
        "Cross-Site Scripting (XSS)",
        Category::InjectUnexpectedItems,
    )
    .description(
        "An adversary embeds malicious scripts in content that will be served to web browsers. \
         The goal of the attack is for the target software, the client-side browser, to execute \
         the script with the users' privilege level.",
    )
    .prerequisites([
        "Target client software must be a client that allows scripting communication from \
         remote hosts, such as a JavaScript-enabled Web Browser.",
    ])
    .risk_text("Cross-Site Scripting (XSS) risk at {component}")
    .cwe_ids([79, 20])
    .reference("https://capec.mitre.org/data/definitions/63.html")
    .rated(Impact::High, Likelihood::VeryLikely);

    let threat = ComponentThreat::new(meta, |model, c| {
        if model.component(c).is_web_application() {
            Ok(vec![Incident::component()])
        } else {
            Ok(Vec::new())
        }
    })
    // The generic input-validation templates split by service flavor; only
    // hand out the REST/SOAP variants to matching components.
    .with_template_filter(|model, c, tpl| {
        let component = model.component(c);
        if !tpl.cwe_ids.contains(&20) {
            return true;
        }
        match tpl.sub_category.as_str() {
            "RESTful Web Service" => {
                component.technology == Technology::WebServiceRest
                    && component.accepts_data_formats.contains(&DataFormat::Json)
            },
            "SOAP Web Service" => {
                component.technology == Technology::WebServiceSoap
                    && component.accepts_data_formats.contains(&DataFormat::Xml)
            },
            _ => true,
        }
    });

    Threat::Component(threat)
}

/// CAPEC-66: SQL Injection, once per outgoing relational-database flow
#[must_use]
pub fn capec_66() -> Threat {
    let meta = ThreatMeta::new("CAPEC-66", "SQL Injection", Category::InjectUnexpectedItems)
        .description(
            "This attack exploits target software that constructs SQL statements based on user \
             input. An attacker crafts input strings so that when the target software constructs \
             SQL statements based on the input, the resulting SQL statement performs actions \
             other than those the application intended.",
        )
        .prerequisites([
            "SQL queries used by the application to store, retrieve or modify data.",
            "User-controllable input that is not properly validated by the application as part \
             of SQL queries.",
        ])
        .risk_text("SQL Injection risk at {component} against database {data_flow.destination} via {data_flow}")
        .cwe_ids([89, 1286])
        .reference("https://capec.mitre.org/data/definitions/66.html")
        .rated(Impact::VeryHigh, Likelihood::VeryLikely);

    Threat::Component(ComponentThreat::new(meta, |model, c| {
        Ok(model
            .outgoing_flows(c)
            .into_iter()
            .filter(|&f| model.data_flow(f).protocol.is_relational_database())
            .map(Incident::via)
            .collect())
    }))
}

/// CAPEC-126: Path Traversal, once per outgoing flow into a filesystem
#[must_use]
pub fn capec_126() -> Threat {
    let meta = ThreatMeta::new("CAPEC-126", "Path Traversal", Category::ManipulateDataStructures)
        .description(
            "An adversary uses path manipulation methods to exploit insufficient input \
             validation of a target to obtain access to data that should not be retrievable by \
             ordinary well-formed requests.",
        )
        .prerequisites([
            "The attacker must be able to control the path that is requested of the target.",
            "The target must fail to adequately sanitize incoming paths.",
        ])
        .risk_text("Path-Traversal risk at {component} against filesystem {data_flow.destination} via {data_flow}")
        .cwe_ids([22])
        .reference("https://capec.mitre.org/data/definitions/126.html")
        .rated(Impact::High, Likelihood::Likely);

    Threat::Component(ComponentThreat::new(meta, |model, c| {
        Ok(model
            .outgoing_flows(c)
            .into_iter()
            .filter(|&f| {
                matches!(
                    model.component(model.data_flow(f).destination).technology,
                    Technology::FileServer | Technology::LocalFileSystem
                )
            })
            .map(Incident::via)
            .collect())
    }))
}

/// CAPEC-136: LDAP Injection, once per outgoing directory flow
#[must_use]
pub fn capec_136() -> Threat {
    let meta = ThreatMeta::new("CAPEC-136", "LDAP Injection", Category::InjectUnexpectedItems)
        .description(
            "An attacker manipulates or crafts an LDAP query for the purpose of undermining the \
             security of the target. An attacker could use user-controlled input to inject \
             additional commands into an LDAP query that could disclose sensitive information.",
        )
        .prerequisites([
            "The target application must accept a string as user input, fail to sanitize \
             characters that have a special meaning in LDAP queries, and insert the \
             user-supplied string in an LDAP query which is then processed.",
        ])
        .risk_text("LDAP Injection risk at {component} against LDAP server {data_flow.destination} via {data_flow}.")
        .cwe_ids([77, 90, 20])
        .reference("https://capec.mitre.org/data/definitions/136.html")
        .rated(Impact::High, Likelihood::Likely);

    Threat::Component(ComponentThreat::new(meta, |model, c| {
        use crate::data_flow::Protocol;
        Ok(model
            .outgoing_flows(c)
            .into_iter()
            .filter(|&f| matches!(model.data_flow(f).protocol, Protocol::Ldap | Protocol::Ldaps))
            .map(Incident::via)
            .collect())
    }))
}

/// CAPEC-250: XML Injection
#[must_use]
pub fn capec_250() -> Threat {
    let meta = ThreatMeta::new("CAPEC-250", "XML Injection", Category::InjectUnexpectedItems)
        .description(
            "An attacker utilizes crafted XML user-controllable input to probe, attack, and \
             inject data into the XML database, using techniques similar to SQL injection.",
        )
        .prerequisites([
            "XML queries used to process user input and retrieve information stored in XML \
             documents.",
            "User-controllable input not properly sanitized.",
        ])
        .risk_text("XML Injection risk at {component}.")
        .cwe_ids([91, 74, 20, 707])
        .reference("https://capec.mitre.org/data/definitions/250.html")
        .rated(Impact::Medium, Likelihood::Likely);

    Threat::Component(ComponentThreat::new(meta, |model, c| {
        let component = model.component(c);
        if component.accepts_data_formats.contains(&DataFormat::Xml) {
            Ok(vec![Incident::component()])
        } else {
            Ok(Vec::new())
        }
    }))
}

/// CAPEC-664: Server Side Request Forgery, once per outgoing web-access flow
#[must_use]
pub fn capec_664() -> Threat {
    let meta = ThreatMeta::new(
        "CAPEC-664",
        "Server Side Request Forgery (SSRF)",
        Category::SubvertAccessControl,
    )
    .description(
        "An adversary exploits improper input validation by submitting maliciously crafted \
         input to a target application running on a server, with the goal of forcing the server \
         to make a request either to itself, to web services running in the server's internal \
         network, or to external third parties.",
    )
    .prerequisites(["Server must be running a web application that processes HTTP requests."])
    .risk_text("Server Side Request Forgery (SSRF) risk at {component} requesting the target {data_flow.destination} via {data_flow}.")
    .cwe_ids([918, 20])
    .reference("https://capec.mitre.org/data/definitions/664.html")
    .rated(Impact::High, Likelihood::Likely);

    Threat::Component(ComponentThreat::new(meta, |model, c| {
        let component = model.component(c);
        // Client software and pure traffic forwarders do not originate
        // attacker-steerable server-side requests.
        if component.is_client() || component.technology == Technology::LoadBalancer {
            return Ok(Vec::new());
        }
        Ok(model
            .outgoing_flows(c)
            .into_iter()
            .filter(|&f| model.data_flow(f).protocol.is_web_access())
            .map(Incident::via)
            .collect())
    }))
}

/// CAPEC-676: NoSQL Injection, once per outgoing NoSQL flow
#[must_use]
pub fn capec_676() -> Threat {
    let meta = ThreatMeta::new("CAPEC-676", "NoSQL Injection", Category::InjectUnexpectedItems)
        .description(
            "An adversary targets software that constructs NoSQL statements based on user input \
             or with parameters vulnerable to operator replacement in order to achieve a variety \
             of technical impacts such as escalating privileges, bypassing authentication, \
             and/or executing code.",
        )
        .prerequisites([
            "NoSQL queries used by the application to store, retrieve, or modify data.",
            "User-controllable input that is not properly validated by the application as part \
             of NoSQL queries.",
        ])
        .risk_text("NoSQL Injection risk at {component} against database {data_flow.destination} via {data_flow}")
        .cwe_ids([943, 1286])
        .reference("https://capec.mitre.org/data/definitions/676.html")
        .rated(Impact::VeryHigh, Likelihood::VeryLikely);

    Threat::Component(ComponentThreat::new(meta, |model, c| {
        Ok(model
            .outgoing_flows(c)
            .into_iter()
            .filter(|&f| model.data_flow(f).protocol.is_nosql_database())
            .map(Incident::via)
            .collect())
    }))
}
