/// Representative Meteomatics API response payloads for parser tests.
///
/// The provider answers a multi-parameter request with one `data` entry per
/// parameter, each holding one `coordinates` entry per requested point and
/// a time-ordered `dates` array:
///
/// ```text
/// { "version": "3.0", "status": "OK",
///   "data": [
///     { "parameter": "t_2m:C",
///       "coordinates": [ { "lat": .., "lon": .., "dates": [ { "date": .., "value": .. } ] } ] },
///     { "parameter": "relative_humidity_2m:p", ... }
///   ] }
/// ```

/// Athens, four hourly samples of both parameters.
#[cfg(test)]
pub(crate) fn fixture_athens_json() -> &'static str {
    r#"{
      "version": "3.0",
      "user": "forecast_user",
      "dateGenerated": "2024-05-01T08:12:44Z",
      "status": "OK",
      "data": [
        {
          "parameter": "t_2m:C",
          "coordinates": [{
            "lat": 37.98381,
            "lon": 23.727539,
            "dates": [
              { "date": "2024-05-01T00:00:00Z", "value": 16.4 },
              { "date": "2024-05-01T01:00:00Z", "value": 15.9 },
              { "date": "2024-05-01T02:00:00Z", "value": 15.1 },
              { "date": "2024-05-01T03:00:00Z", "value": 14.8 }
            ]
          }]
        },
        {
          "parameter": "relative_humidity_2m:p",
          "coordinates": [{
            "lat": 37.98381,
            "lon": 23.727539,
            "dates": [
              { "date": "2024-05-01T00:00:00Z", "value": 61.2 },
              { "date": "2024-05-01T01:00:00Z", "value": 63.0 },
              { "date": "2024-05-01T02:00:00Z", "value": 66.7 },
              { "date": "2024-05-01T03:00:00Z", "value": 68.1 }
            ]
          }]
        }
      ]
    }"#
}

/// Parameters listed humidity-first, to check series are found by name
/// rather than by position.
#[cfg(test)]
pub(crate) fn fixture_reversed_parameters_json() -> &'static str {
    r#"{
      "version": "3.0",
      "status": "OK",
      "data": [
        {
          "parameter": "relative_humidity_2m:p",
          "coordinates": [{ "lat": 40.629269, "lon": 22.947412, "dates": [
            { "date": "2024-05-01T00:00:00Z", "value": 72.5 },
            { "date": "2024-05-01T01:00:00Z", "value": 74.0 }
          ]}]
        },
        {
          "parameter": "t_2m:C",
          "coordinates": [{ "lat": 40.629269, "lon": 22.947412, "dates": [
            { "date": "2024-05-01T00:00:00Z", "value": 12.3 },
            { "date": "2024-05-01T01:00:00Z", "value": 11.8 }
          ]}]
        }
      ]
    }"#
}

/// Humidity series is missing entirely. No records should be produced.
#[cfg(test)]
pub(crate) fn fixture_missing_humidity_json() -> &'static str {
    r#"{
      "version": "3.0",
      "status": "OK",
      "data": [
        {
          "parameter": "t_2m:C",
          "coordinates": [{ "lat": 34.923096, "lon": 33.634045, "dates": [
            { "date": "2024-05-01T00:00:00Z", "value": 19.0 }
          ]}]
        }
      ]
    }"#
}

/// Humidity series one sample shorter than temperature. Pairing is by
/// index, so the output stops at the shorter series.
#[cfg(test)]
pub(crate) fn fixture_uneven_series_json() -> &'static str {
    r#"{
      "version": "3.0",
      "status": "OK",
      "data": [
        {
          "parameter": "t_2m:C",
          "coordinates": [{ "lat": 34.923096, "lon": 33.634045, "dates": [
            { "date": "2024-05-01T00:00:00Z", "value": 19.0 },
            { "date": "2024-05-01T01:00:00Z", "value": 18.5 },
            { "date": "2024-05-01T02:00:00Z", "value": 18.1 }
          ]}]
        },
        {
          "parameter": "relative_humidity_2m:p",
          "coordinates": [{ "lat": 34.923096, "lon": 33.634045, "dates": [
            { "date": "2024-05-01T00:00:00Z", "value": 55.0 },
            { "date": "2024-05-01T01:00:00Z", "value": 57.5 }
          ]}]
        }
      ]
    }"#
}

/// Not a provider payload at all (e.g. an HTML error page behind a 200).
#[cfg(test)]
pub(crate) fn fixture_malformed_json() -> &'static str {
    "<html><body>Service Unavailable</body></html>"
}
