//! GraphQL documents sent to the Kraken API

pub const OBTAIN_TOKEN_MUTATION: &str = r#"
mutation obtainKrakenToken($input: ObtainJSONWebTokenInput!) {
  obtainKrakenToken(input: $input) {
    token
  }
}
"#;

pub const ACCOUNT_QUERY: &str = r#"
query Account($accountNumber: String!) {
  account(accountNumber: $accountNumber) {
    number
    properties {
      electricityMeterPoints {
        mpan
        meters {
          serialNumber
          consumptionUnits
        }
        agreements {
          validFrom
          validTo
          tariff {
            ... on TariffType {
              displayName
              productCode
              tariffCode
            }
          }
        }
      }
      gasMeterPoints {
        mprn
        meters {
          serialNumber
          consumptionUnits
        }
        agreements {
          validFrom
          validTo
          tariff {
            ... on TariffType {
              displayName
              productCode
              tariffCode
            }
          }
        }
      }
    }
  }
}
"#;
